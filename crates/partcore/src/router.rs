//! Insert routing.
//!
//! Given a new row and an existing layout, decide which partition the row
//! belongs to. Routing never writes rows; callers append through
//! [`PartitionLayout::append`] or their own store.

use crate::error::{Error, Result};
use crate::layout::{Partition, PartitionLayout, Scheme};
use crate::row::{Key, Row};
use tracing::{trace, warn};

/// Returns the partition index `row` should be written to.
///
/// * Range layouts: the partition whose `[lower, upper)` bounds contain the
///   row's key. Values outside every interval fail with `OutOfRange`; bounds
///   are never extended.
/// * Round-robin layouts: the current cursor slot. The cursor advances on
///   every call, so routing the same row twice yields different indices.
///   Take a [`crate::layout::RotationCursor::snapshot`] first for a dry run.
pub fn route(layout: &PartitionLayout, row: &Row) -> Result<usize> {
    match layout.scheme() {
        Scheme::Range {
            column,
            column_index,
        } => {
            let key = key_of(row, *column_index, column)?;
            match locate_interval(layout.partitions(), &key) {
                Some(index) => {
                    trace!(%key, index, "routed by range");
                    Ok(index)
                }
                None => {
                    warn!(%key, column = %column, "value outside all range partitions");
                    Err(Error::OutOfRange {
                        value: key.to_string(),
                    })
                }
            }
        }
        Scheme::RoundRobin { cursor } => {
            let index = cursor.advance();
            trace!(index, "routed by rotation cursor");
            Ok(index)
        }
    }
}

/// Extracts the numeric partitioning key of `row`.
pub(crate) fn key_of(row: &Row, column_index: usize, column: &str) -> Result<Key> {
    let value = row
        .get(column_index)
        .ok_or_else(|| Error::invalid(format!("row has no value for column '{column}'")))?;
    value.key().ok_or_else(|| {
        Error::invalid(format!(
            "column '{column}' value {value} is not numeric"
        ))
    })
}

/// Binary search for the partition whose interval contains `key`.
///
/// Relies on intervals being sorted and contiguous.
pub(crate) fn locate_interval(partitions: &[Partition], key: &Key) -> Option<usize> {
    let index = partitions.partition_point(|p| match p.interval() {
        Some(interval) => interval.upper <= *key,
        None => false,
    });
    partitions
        .get(index)
        .and_then(|p| p.interval())
        .filter(|interval| interval.contains(key))
        .map(|_| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::{Partitioner, RangePartitioner, RoundRobinPartitioner};
    use crate::row::{Column, ColumnType, Schema, Value};
    use crate::store::MemoryStore;

    fn store(n: i64) -> MemoryStore {
        let schema = Schema::new(vec![
            Column::new("id", ColumnType::Int),
            Column::new("v", ColumnType::Int),
        ])
        .unwrap();
        MemoryStore::load(
            schema,
            (1..=n).map(|i| Row::new(vec![Value::Int(i), Value::Int(i)])),
        )
        .unwrap()
    }

    fn row(v: Value) -> Row {
        Row::new(vec![Value::Int(100), v])
    }

    #[test]
    fn test_range_route_boundaries() {
        let layout = RangePartitioner::new("v").build(&store(10), 3).unwrap();
        assert_eq!(route(&layout, &row(Value::Int(1))).unwrap(), 0);
        assert_eq!(route(&layout, &row(Value::Int(4))).unwrap(), 0);
        assert_eq!(route(&layout, &row(Value::Int(5))).unwrap(), 1);
        assert_eq!(route(&layout, &row(Value::Int(9))).unwrap(), 2);
        // Above the original max but still inside the last interval.
        assert_eq!(route(&layout, &row(Value::Int(12))).unwrap(), 2);
        assert_eq!(route(&layout, &row(Value::Float(4.5))).unwrap(), 0);
    }

    #[test]
    fn test_range_route_out_of_range() {
        let layout = RangePartitioner::new("v").build(&store(10), 3).unwrap();
        assert_eq!(
            route(&layout, &row(Value::Int(0))),
            Err(Error::OutOfRange { value: "0".into() })
        );
        assert!(matches!(
            route(&layout, &row(Value::Int(13))),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_range_route_rejects_non_numeric() {
        let layout = RangePartitioner::new("v").build(&store(10), 3).unwrap();
        assert!(matches!(
            route(&layout, &row(Value::Null)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            route(&layout, &Row::new(vec![Value::Int(1)])),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_round_robin_route_is_not_idempotent() {
        let layout = RoundRobinPartitioner::new().build(&store(4), 3).unwrap();
        let same = row(Value::Int(1));
        assert_eq!(route(&layout, &same).unwrap(), 1);
        assert_eq!(route(&layout, &same).unwrap(), 2);
        assert_eq!(route(&layout, &same).unwrap(), 0);
    }

    #[test]
    fn test_round_robin_dry_run_with_snapshot() {
        let layout = RoundRobinPartitioner::new().build(&store(5), 3).unwrap();
        let cursor = layout.cursor().unwrap();
        let snapshot = cursor.snapshot();
        let planned = route(&layout, &row(Value::Int(1))).unwrap();
        cursor.restore(snapshot);
        assert_eq!(route(&layout, &row(Value::Int(1))).unwrap(), planned);
    }

    #[test]
    fn test_range_route_does_not_touch_rows() {
        let layout = RangePartitioner::new("v").build(&store(10), 3).unwrap();
        let before = layout.sizes();
        route(&layout, &row(Value::Int(2))).unwrap();
        assert_eq!(layout.sizes(), before);
    }
}

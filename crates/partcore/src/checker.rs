//! Invariant checking.
//!
//! Every layout must satisfy, relative to its source collection:
//!
//! 1. **Completeness**: the partitions hold at least as many rows as the source
//! 2. **Disjointness**: no row identifier appears in two partitions
//! 3. **Reconstruction**: the bag union of all partitions equals the source
//!
//! Violations are diagnostics only. Nothing here repairs a broken layout.

use crate::error::Error as CoreError;
use crate::layout::{PartitionLayout, Scheme};
use crate::partitioner::fair_split;
use crate::row::{Row, Schema, Value};
use crate::store::{AggregateOp, BulkStore};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Direction of a reconstruction mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// The partitions hold rows the source does not.
    MoreThanExpected,
    /// Source rows are missing from the partitions.
    FewerThanExpected,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MoreThanExpected => write!(f, "more rows than expected"),
            Mismatch::FewerThanExpected => write!(f, "fewer rows than expected"),
        }
    }
}

/// A broken layout invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Completeness violated: expected {expected} rows after merging all partitions, found {actual}")]
    Incomplete { expected: usize, actual: usize },
    #[error("Disjointness violated: row {id} appears in partition {first} and partition {second}")]
    Overlap {
        id: String,
        first: usize,
        second: usize,
    },
    #[error("Reconstruction violated: {direction} ({delta} rows)")]
    ReconstructionMismatch { direction: Mismatch, delta: usize },
    #[error("Expected {expected} partitions but found {actual}")]
    PartitionCount { expected: usize, actual: usize },
    #[error("Partition {index} has {actual} rows while the correct number is {expected}")]
    PartitionSize {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Row {id} found {found} times in partition {expected}, expected exactly once")]
    Misplaced {
        id: String,
        expected: usize,
        found: usize,
    },
    #[error("Source could not be read: {0}")]
    Source(#[from] CoreError),
}

/// Verifies completeness, disjointness and reconstruction against `source`.
///
/// Completeness compares against the store's `aggregate(id, Count)`.
pub fn verify(layout: &PartitionLayout, source: &dyn BulkStore) -> Result<(), Violation> {
    let expected = source_count(source)?;
    let actual = layout.row_count();
    if actual < expected {
        return Err(Violation::Incomplete { expected, actual });
    }
    let rows = source.scan(None)?;
    verify_rows(layout, &rows, source.schema().id_index())
}

/// Row count of `source` as reported by `aggregate(id, Count)`.
fn source_count(source: &dyn BulkStore) -> Result<usize, Violation> {
    let id = &source.schema().id_column().name;
    match source.aggregate(id, AggregateOp::Count)? {
        Some(Value::Int(count)) => usize::try_from(count).map_err(|_| {
            CoreError::InvalidArgument(format!("store reported a negative row count {count}"))
                .into()
        }),
        other => Err(CoreError::InvalidArgument(format!(
            "store returned {other:?} for a row count"
        ))
        .into()),
    }
}

/// Like [`verify`], against an explicit list of source rows.
///
/// Checks run in order: completeness, disjointness, reconstruction. The
/// first failure is returned.
pub fn verify_rows(
    layout: &PartitionLayout,
    source: &[Row],
    id_index: usize,
) -> Result<(), Violation> {
    let actual = layout.row_count();
    if actual < source.len() {
        return Err(Violation::Incomplete {
            expected: source.len(),
            actual,
        });
    }

    let mut owners: HashMap<Option<&Value>, usize> = HashMap::with_capacity(actual);
    for partition in layout.partitions() {
        for row in partition.rows() {
            let id = row.get(id_index);
            if let Some(first) = owners.insert(id, partition.index()) {
                return Err(Violation::Overlap {
                    id: id.map(Value::to_string).unwrap_or_default(),
                    first,
                    second: partition.index(),
                });
            }
        }
    }

    // +1 per source row, -1 per partition row; leftovers are the delta.
    let mut balance: HashMap<&Row, isize> = HashMap::with_capacity(source.len());
    for row in source {
        *balance.entry(row).or_default() += 1;
    }
    for row in layout.partitions().iter().flat_map(|p| p.rows()) {
        *balance.entry(row).or_default() -= 1;
    }
    let missing: usize = balance.values().filter(|&&b| b > 0).map(|&b| b as usize).sum();
    let extra: usize = balance.values().filter(|&&b| b < 0).map(|&b| (-b) as usize).sum();

    if missing > 0 {
        return Err(Violation::ReconstructionMismatch {
            direction: Mismatch::FewerThanExpected,
            delta: missing,
        });
    }
    if extra > 0 {
        return Err(Violation::ReconstructionMismatch {
            direction: Mismatch::MoreThanExpected,
            delta: extra,
        });
    }
    Ok(())
}

/// Checks the layout has exactly `expected` partitions.
pub fn verify_partition_count(layout: &PartitionLayout, expected: usize) -> Result<(), Violation> {
    if layout.len() != expected {
        return Err(Violation::PartitionCount {
            expected,
            actual: layout.len(),
        });
    }
    Ok(())
}

/// Checks each partition's size against a count derived from `source`.
///
/// Range layouts: the number of source rows whose key lies in the
/// partition's interval. Round-robin layouts: the fair split of the source
/// row count.
pub fn verify_partition_sizes(
    layout: &PartitionLayout,
    source: &dyn BulkStore,
) -> Result<(), Violation> {
    let expected = match layout.scheme() {
        Scheme::Range { column_index, .. } => {
            let rows = source.scan(None)?;
            layout
                .partitions()
                .iter()
                .map(|p| match p.interval() {
                    Some(interval) => rows
                        .iter()
                        .filter_map(|r| r.get(*column_index).and_then(Value::key))
                        .filter(|k| interval.contains(k))
                        .count(),
                    None => 0,
                })
                .collect::<Vec<_>>()
        }
        Scheme::RoundRobin { .. } => fair_split(source_count(source)?, layout.len()),
    };

    for (partition, expected) in layout.partitions().iter().zip(expected) {
        if partition.len() != expected {
            return Err(Violation::PartitionSize {
                index: partition.index(),
                expected,
                actual: partition.len(),
            });
        }
    }
    Ok(())
}

/// Checks the row identified by `id` sits exactly once in partition `index`.
pub fn verify_membership(
    layout: &PartitionLayout,
    schema: &Schema,
    index: usize,
    id: &Value,
) -> Result<(), Violation> {
    let found = layout
        .partition(index)
        .map(|p| {
            p.rows()
                .iter()
                .filter(|r| r.get(schema.id_index()) == Some(id))
                .count()
        })
        .unwrap_or(0);
    if found != 1 {
        return Err(Violation::Misplaced {
            id: id.to_string(),
            expected: index,
            found,
        });
    }
    Ok(())
}

//! Round-robin partitioner implementation.
//!
//! Rows are assigned in contiguous blocks, not interleaved: with `total`
//! rows and `n` partitions, partition `i` receives the next
//! `total / n + 1` rows if `i < total % n` and `total / n` rows otherwise.
//! Sizes therefore never differ by more than one.
//!
//! After the build the layout's rotation cursor sits at `total % n`, as if
//! each loaded row had advanced it once from zero.

use crate::error::{partition_count, Error, Result};
use crate::layout::{Partition, PartitionLayout, RotationCursor, Scheme};
use crate::partitioner::traits::Partitioner;
use crate::store::BulkStore;
use tracing::{debug, info};

/// Target row count of each partition for a fair split of `total` rows.
///
/// # Example
///
/// ```rust
/// use partcore::partitioner::fair_split;
///
/// assert_eq!(fair_split(11, 3), vec![4, 4, 3]);
/// ```
pub fn fair_split(total: usize, n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let base = total / n;
    let remainder = total % n;
    (0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Round-robin partitioner.
///
/// Assignment depends on row order, so rows are scanned ordered by the
/// schema's identifier column unless another column is configured.
#[derive(Clone, Debug, Default)]
pub struct RoundRobinPartitioner {
    order_by: Option<String>,
}

impl RoundRobinPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders the source scan by `column` instead of the identifier.
    pub fn ordered_by(column: impl Into<String>) -> Self {
        Self {
            order_by: Some(column.into()),
        }
    }
}

impl Partitioner for RoundRobinPartitioner {
    fn build(&self, source: &dyn BulkStore, partitions: i64) -> Result<PartitionLayout> {
        let n = partition_count(partitions)?;
        let schema = source.schema();
        let order_by = match &self.order_by {
            Some(column) => {
                schema.resolve(column)?;
                column.as_str()
            }
            None => schema.id_column().name.as_str(),
        };
        if source.is_empty() {
            return Err(Error::EmptySource);
        }

        let rows = source.scan(Some(order_by))?;
        let total = rows.len();

        let targets = fair_split(total, n);
        debug!(total, partitions = n, ?targets, "round-robin targets");

        let mut parts: Vec<Partition> = targets
            .iter()
            .enumerate()
            .map(|(index, &target)| Partition::with_capacity(index, target))
            .collect();
        let mut current = 0;
        for row in rows {
            parts[current].push(row);
            if parts[current].len() >= targets[current] && current + 1 < n {
                current += 1;
            }
        }

        let cursor = RotationCursor::new(total % n, n);
        info!(
            partitions = n,
            rows = total,
            cursor = cursor.peek(),
            "round-robin layout built"
        );
        Ok(PartitionLayout::new(Scheme::RoundRobin { cursor }, parts))
    }

    fn name(&self) -> &'static str {
        "RoundRobinPartitioner"
    }
}

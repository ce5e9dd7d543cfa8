//! Range partitioner implementation.
//!
//! # Algorithm
//!
//! 1. Compute `min` and `max` of the partitioning column
//! 2. `width = ceil((max - min + 1) / n)`
//! 3. Partition `i` covers `[min + i*width, min + (i+1)*width)`
//! 4. Every row goes to the interval containing its key
//!
//! The `+1` bias together with ceiling division guarantees
//! `n * width >= max - min + 1`, so `max` always falls inside the last
//! interval.

use crate::error::{partition_count, Error, Result};
use crate::layout::{Interval, Partition, PartitionLayout, Scheme};
use crate::partitioner::traits::Partitioner;
use crate::router::{key_of, locate_interval};
use crate::row::Key;
use crate::store::{AggregateOp, BulkStore};
use tracing::{debug, info};

/// Range partitioner over a numeric column.
#[derive(Clone, Debug)]
pub struct RangePartitioner {
    column: String,
}

impl RangePartitioner {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    /// Computes `n` contiguous half-open intervals covering `[min, max]`.
    ///
    /// Integer keys use exact ceiling division. If either bound is a float
    /// the arithmetic is done in `f64`. Each lower bound is the previous
    /// upper bound, so adjacent intervals always meet exactly.
    pub fn intervals(min: Key, max: Key, n: usize) -> Vec<Interval> {
        debug_assert!(n > 0);
        let mut intervals = Vec::with_capacity(n);
        match (min, max) {
            (Key::Int(lo), Key::Int(hi)) => {
                let n = n as i128;
                let span = hi - lo + 1;
                let width = (span + n - 1).div_euclid(n);
                let mut lower = lo;
                for _ in 0..n {
                    let upper = lower + width;
                    intervals.push(Interval::new(Key::Int(lower), Key::Int(upper)));
                    lower = upper;
                }
            }
            _ => {
                let (lo, hi) = (min.as_f64(), max.as_f64());
                let width = ((hi - lo + 1.0) / n as f64).ceil();
                let mut lower = lo;
                for _ in 0..n {
                    let upper = lower + width;
                    intervals.push(Interval::new(Key::Float(lower), Key::Float(upper)));
                    lower = upper;
                }
            }
        }
        intervals
    }

    fn bound(&self, source: &dyn BulkStore, op: AggregateOp) -> Result<Key> {
        let value = source.aggregate(&self.column, op)?.ok_or_else(|| {
            Error::invalid(format!("column '{}' has no numeric values", self.column))
        })?;
        value.key().ok_or_else(|| {
            Error::invalid(format!(
                "column '{}' holds non-numeric value {}",
                self.column, value
            ))
        })
    }
}

impl Partitioner for RangePartitioner {
    fn build(&self, source: &dyn BulkStore, partitions: i64) -> Result<PartitionLayout> {
        let n = partition_count(partitions)?;
        let schema = source.schema();
        let column_index = schema.resolve(&self.column)?;
        let ty = schema.columns()[column_index].ty;
        if !ty.is_numeric() {
            return Err(Error::invalid(format!(
                "column '{}' is {:?}, range partitioning needs a numeric column",
                self.column, ty
            )));
        }
        if source.is_empty() {
            return Err(Error::EmptySource);
        }

        let min = self.bound(source, AggregateOp::Min)?;
        let max = self.bound(source, AggregateOp::Max)?;
        let mut parts: Vec<Partition> = Self::intervals(min, max, n)
            .into_iter()
            .enumerate()
            .map(|(index, interval)| Partition::new(index, Some(interval)))
            .collect();
        debug!(column = %self.column, %min, %max, partitions = n, "computed range bounds");

        for row in source.scan(None)? {
            let key = key_of(&row, column_index, &self.column)?;
            let index = locate_interval(&parts, &key).ok_or_else(|| Error::OutOfRange {
                value: key.to_string(),
            })?;
            parts[index].push(row);
        }

        let layout = PartitionLayout::new(
            Scheme::Range {
                column: self.column.clone(),
                column_index,
            },
            parts,
        );
        info!(
            column = %self.column,
            partitions = n,
            rows = layout.row_count(),
            "range layout built"
        );
        Ok(layout)
    }

    fn name(&self) -> &'static str {
        "RangePartitioner"
    }
}

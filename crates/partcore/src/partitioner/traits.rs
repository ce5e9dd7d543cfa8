//! Core partitioner trait definitions.

use crate::error::Result;
use crate::layout::PartitionLayout;
use crate::store::BulkStore;

/// A partitioner splits a source collection into disjoint partitions.
///
/// Partitioners hold only their configuration; all routing state lives in
/// the layout they produce, so one partitioner can build many layouts.
pub trait Partitioner: Send + Sync {
    /// Builds a layout of `partitions` partitions from `source`.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` when `partitions <= 0` or a required column is
    ///   missing or has the wrong type
    /// * `EmptySource` when `source` holds no rows
    fn build(&self, source: &dyn BulkStore, partitions: i64) -> Result<PartitionLayout>;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}

//! Partitioner abstraction.
//!
//! Partitioners read a source collection from a bulk store and split it
//! into a [`crate::layout::PartitionLayout`].

pub mod range;
pub mod round_robin;
pub mod traits;

pub use range::RangePartitioner;
pub use round_robin::{fair_split, RoundRobinPartitioner};
pub use traits::Partitioner;

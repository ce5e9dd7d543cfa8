//! Core library for row partitioning.
//!
//! This crate provides the fundamental abstractions for splitting a flat
//! dataset into disjoint partitions:
//! - Row, value and schema types
//! - The bulk store contract and an in-memory store
//! - Range and round-robin partitioner algorithms
//! - Partition layouts and the round-robin rotation cursor
//! - Insert routing and invariant checking

pub mod checker;
pub mod error;
pub mod layout;
pub mod partitioner;
pub mod router;
pub mod row;
pub mod store;

pub use checker::{verify, Violation};
pub use error::{Error, Result};
pub use layout::{Interval, Partition, PartitionLayout, RotationCursor, Scheme};
pub use partitioner::{Partitioner, RangePartitioner, RoundRobinPartitioner};
pub use row::{Column, ColumnType, Key, Row, Schema, Value};
pub use store::{AggregateOp, BulkStore, MemoryStore};

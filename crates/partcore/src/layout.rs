//! Partition layouts.
//!
//! A [`PartitionLayout`] is the product of exactly one partitioning run. It
//! owns copies of the rows it was built from, so the source collection can be
//! dropped or mutated afterwards without affecting it.
//!
//! # Invariants
//!
//! - A layout always holds at least one partition
//! - Range layouts: partition `i`'s upper bound equals partition `i+1`'s lower bound
//! - Round-robin layouts: the rotation cursor is always `< len()`

use crate::error::{Error, Result};
use crate::row::{Key, Row};
use crate::store::BulkStore;
use parking_lot::Mutex;
use std::fmt;

/// Half-open numeric interval `[lower, upper)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub lower: Key,
    pub upper: Key,
}

impl Interval {
    pub fn new(lower: Key, upper: Key) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.lower <= *key && *key < self.upper
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}

/// Point-in-time copy of a rotation cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorSnapshot(usize);

impl CursorSnapshot {
    pub fn position(&self) -> usize {
        self.0
    }
}

/// Round-robin insert cursor scoped to one layout.
///
/// Every [`RotationCursor::advance`] returns the current slot and moves to the
/// next one. The position lives behind a mutex so concurrent routers on a
/// shared layout each receive a distinct, consecutive slot.
#[derive(Debug)]
pub struct RotationCursor {
    position: Mutex<usize>,
    modulus: usize,
}

impl RotationCursor {
    /// Creates a cursor over `modulus` partitions starting at `start mod modulus`.
    pub(crate) fn new(start: usize, modulus: usize) -> Self {
        debug_assert!(modulus > 0);
        Self {
            position: Mutex::new(start % modulus),
            modulus,
        }
    }

    /// Returns the slot the next insert will land in without advancing.
    pub fn peek(&self) -> usize {
        *self.position.lock()
    }

    /// Returns the current slot and advances by one.
    pub fn advance(&self) -> usize {
        let mut position = self.position.lock();
        let slot = *position;
        *position = (slot + 1) % self.modulus;
        slot
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot(self.peek())
    }

    /// Rewinds (or forwards) the cursor to a previously taken snapshot.
    pub fn restore(&self, snapshot: CursorSnapshot) {
        *self.position.lock() = snapshot.0 % self.modulus;
    }
}

impl Clone for RotationCursor {
    fn clone(&self) -> Self {
        Self::new(self.peek(), self.modulus)
    }
}

/// The scheme a layout was built with, plus its routing state.
#[derive(Debug, Clone)]
pub enum Scheme {
    Range {
        column: String,
        column_index: usize,
    },
    RoundRobin {
        cursor: RotationCursor,
    },
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Range { .. } => "range",
            Scheme::RoundRobin { .. } => "round-robin",
        }
    }
}

/// One partition: its position in the layout and the rows it owns.
#[derive(Debug, Clone)]
pub struct Partition {
    index: usize,
    rows: Vec<Row>,
    interval: Option<Interval>,
}

impl Partition {
    pub(crate) fn new(index: usize, interval: Option<Interval>) -> Self {
        Self {
            index,
            rows: Vec::new(),
            interval,
        }
    }

    pub(crate) fn with_capacity(index: usize, capacity: usize) -> Self {
        Self {
            index,
            rows: Vec::with_capacity(capacity),
            interval: None,
        }
    }

    pub(crate) fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Range bounds; `None` for round-robin partitions.
    pub fn interval(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }

    /// Conventional partition name, e.g. `range_part3`.
    pub fn name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.index)
    }
}

/// An ordered sequence of partitions produced by one scheme.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    scheme: Scheme,
    partitions: Vec<Partition>,
}

impl PartitionLayout {
    pub(crate) fn new(scheme: Scheme, partitions: Vec<Partition>) -> Self {
        debug_assert!(!partitions.is_empty());
        Self { scheme, partitions }
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Total rows across all partitions.
    pub fn row_count(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }

    /// Row count of each partition, in partition order.
    pub fn sizes(&self) -> Vec<usize> {
        self.partitions.iter().map(Partition::len).collect()
    }

    /// The rotation cursor, for round-robin layouts.
    pub fn cursor(&self) -> Option<&RotationCursor> {
        match &self.scheme {
            Scheme::RoundRobin { cursor } => Some(cursor),
            Scheme::Range { .. } => None,
        }
    }

    /// Decides which partition `row` belongs to. See [`crate::router::route`].
    pub fn route(&self, row: &Row) -> Result<usize> {
        crate::router::route(self, row)
    }

    /// Appends `row` to partition `index` without routing.
    pub fn append(&mut self, index: usize, row: Row) -> Result<()> {
        let len = self.partitions.len();
        let partition = self.partitions.get_mut(index).ok_or_else(|| {
            Error::invalid(format!("partition {index} does not exist (layout has {len})"))
        })?;
        partition.push(row);
        Ok(())
    }

    /// Routes `row` and appends it to the chosen partition.
    ///
    /// Round-robin layouts advance their cursor once per call. The source
    /// store is not touched; see [`PartitionLayout::insert_into`].
    pub fn insert(&mut self, row: Row) -> Result<usize> {
        let index = self.route(&row)?;
        self.append(index, row)?;
        Ok(index)
    }

    /// Routes `row`, appends it to `store`, then to the chosen partition.
    ///
    /// A row the store rejects leaves the layout and its rotation cursor as
    /// they were, so the two never drift apart.
    pub fn insert_into(&mut self, store: &mut dyn BulkStore, row: Row) -> Result<usize> {
        let snapshot = self.cursor().map(RotationCursor::snapshot);
        let index = self.route(&row)?;
        if let Err(err) = store.append(row.clone()) {
            if let (Some(cursor), Some(snapshot)) = (self.cursor(), snapshot) {
                cursor.restore(snapshot);
            }
            return Err(err);
        }
        self.append(index, row)?;
        Ok(index)
    }
}

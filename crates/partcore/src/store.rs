//! Bulk store contract.
//!
//! The store holds the authoritative source collection. Partitioners only
//! ever read from it through [`BulkStore::scan`] and [`BulkStore::aggregate`];
//! the insert path appends to it after a row has been routed.

use crate::error::{Error, Result};
use crate::row::{Row, Schema, Value};
use std::collections::HashSet;
use tracing::debug;

/// Aggregate operations a store must answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Count,
}

/// The source-collection collaborator consumed by partitioners and the checker.
pub trait BulkStore: Send + Sync {
    /// Row shape of the collection.
    fn schema(&self) -> &Schema;

    /// Number of rows currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of every row, optionally stably ordered by a column.
    fn scan(&self, order_by: Option<&str>) -> Result<Vec<Row>>;

    /// Computes `op` over `column`.
    ///
    /// `Min` and `Max` ignore nulls and yield `None` when no non-null value
    /// exists. `Count` counts rows and always yields `Some(Value::Int(_))`.
    fn aggregate(&self, column: &str, op: AggregateOp) -> Result<Option<Value>>;

    /// Appends a single row to the collection.
    fn append(&mut self, row: Row) -> Result<()>;
}

/// In-memory bulk store keeping rows in load order.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    schema: Schema,
    rows: Vec<Row>,
    ids: HashSet<Value>,
}

impl MemoryStore {
    /// Creates an empty store for `schema`.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Bulk-loads `rows`, validating arity and identifier uniqueness.
    pub fn load(schema: Schema, rows: impl IntoIterator<Item = Row>) -> Result<Self> {
        let mut store = Self::new(schema);
        for row in rows {
            store.push_checked(row)?;
        }
        debug!(rows = store.rows.len(), "bulk load complete");
        Ok(store)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn push_checked(&mut self, row: Row) -> Result<()> {
        self.schema.check_arity(&row)?;
        let id = row.values()[self.schema.id_index()].clone();
        if id.is_null() {
            return Err(Error::invalid("row identifier must not be null"));
        }
        if !self.ids.insert(id.clone()) {
            return Err(Error::invalid(format!("duplicate row identifier {id}")));
        }
        self.rows.push(row);
        Ok(())
    }
}

impl BulkStore for MemoryStore {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn scan(&self, order_by: Option<&str>) -> Result<Vec<Row>> {
        let mut rows = self.rows.clone();
        if let Some(column) = order_by {
            let index = self.schema.resolve(column)?;
            rows.sort_by(|a, b| a.values()[index].cmp(&b.values()[index]));
        }
        Ok(rows)
    }

    fn aggregate(&self, column: &str, op: AggregateOp) -> Result<Option<Value>> {
        let index = self.schema.resolve(column)?;
        if op == AggregateOp::Count {
            let count = i64::try_from(self.rows.len())
                .map_err(|_| Error::invalid("row count exceeds i64"))?;
            return Ok(Some(Value::Int(count)));
        }

        let mut best: Option<&Value> = None;
        for row in &self.rows {
            let value = &row.values()[index];
            if value.is_null() {
                continue;
            }
            if value.key().is_none() {
                return Err(Error::invalid(format!(
                    "column '{column}' holds non-numeric value {value}"
                )));
            }
            best = match best {
                None => Some(value),
                Some(current) => {
                    let better = match op {
                        AggregateOp::Min => value < current,
                        _ => value > current,
                    };
                    Some(if better { value } else { current })
                }
            };
        }
        Ok(best.cloned())
    }

    fn append(&mut self, row: Row) -> Result<()> {
        self.push_checked(row)
    }
}

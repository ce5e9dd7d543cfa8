//! Row, value and schema types.
//!
//! A [`Row`] is an ordered tuple of [`Value`]s. The [`Schema`] names the
//! columns and designates one of them as the row identifier; every other
//! field is opaque to the partitioners.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A single typed field value.
///
/// Floats compare and hash by bit pattern so rows can be counted in bags.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Numeric view of this value, if it can be used as a partitioning key.
    pub fn key(&self) -> Option<Key> {
        match self {
            Value::Int(v) => Some(Key::Int(i128::from(*v))),
            Value::Float(v) if !v.is_nan() => Some(Key::Float(*v)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Bool(_) => 3,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
            Value::Bool(v) => v.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            // Mixed numerics compare by magnitude; ints sort first on ties.
            (Value::Int(a), Value::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (Value::Float(a), Value::Int(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// Numeric partitioning key.
///
/// Integer keys are widened to `i128` so interval arithmetic over the full
/// `i64` domain cannot overflow. Comparisons between an integer and a float
/// key fall back to `f64`.
#[derive(Clone, Copy, Debug)]
pub enum Key {
    Int(i128),
    Float(f64),
}

impl Key {
    pub fn as_f64(&self) -> f64 {
        match self {
            Key::Int(v) => *v as f64,
            Key::Float(v) => *v,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Declared type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Bool,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }

    /// Converts a raw textual field into a value of this type.
    ///
    /// Empty strings become [`Value::Null`].
    pub fn parse_value(&self, raw: &str) -> Result<Value> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        match self {
            ColumnType::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| Error::invalid(format!("'{raw}' is not an integer: {e}"))),
            ColumnType::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| Error::invalid(format!("'{raw}' is not a number: {e}"))),
            ColumnType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "f" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(Error::invalid(format!("'{raw}' is not a boolean"))),
            },
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    /// Parses SQL-style type names such as `BIGINT` or `VARCHAR(255)`.
    /// Unrecognised names are treated as text.
    fn from_str(s: &str) -> Result<Self> {
        let base = s.split('(').next().unwrap_or_default().trim();
        if base.is_empty() {
            return Err(Error::invalid("empty column type"));
        }
        let ty = match base.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "INT2" | "INT4" | "INT8" | "SERIAL"
            | "BIGSERIAL" => ColumnType::Int,
            "REAL" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" | "NUMERIC"
            | "DECIMAL" => ColumnType::Float,
            "BOOL" | "BOOLEAN" => ColumnType::Bool,
            _ => ColumnType::Text,
        };
        Ok(ty)
    }
}

/// A named, typed column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Row shape: ordered columns plus the designated identifier column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    id_index: usize,
}

impl Schema {
    /// Default name of the identifier column.
    pub const DEFAULT_ID: &'static str = "id";

    /// Builds a schema whose identifier column is named `id`.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        Self::with_id_column(columns, Self::DEFAULT_ID)
    }

    pub fn with_id_column(columns: Vec<Column>, id: &str) -> Result<Self> {
        let id_index = columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(id))
            .ok_or_else(|| Error::invalid(format!("identifier column '{id}' not in schema")))?;
        Ok(Self { columns, id_index })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn id_index(&self) -> usize {
        self.id_index
    }

    pub fn id_column(&self) -> &Column {
        &self.columns[self.id_index]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Like [`Schema::column_index`] but fails with `InvalidArgument`.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::invalid(format!("column '{name}' does not exist")))
    }

    /// Checks that `row` has exactly one value per column.
    pub fn check_arity(&self, row: &Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::invalid(format!(
                "row has {} fields, schema has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }
}

/// An ordered tuple of field values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_float_equality_by_bits() {
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Int(1), Value::Float(1.0));

        let mut set = HashSet::new();
        set.insert(Value::Float(2.0));
        assert!(set.contains(&Value::Float(2.0)));
    }

    #[test]
    fn test_value_total_order() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Int(3),
            Value::Null,
            Value::Float(2.5),
            Value::Bool(false),
            Value::Int(1),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Int(1),
                Value::Float(2.5),
                Value::Int(3),
                Value::Text("b".into()),
                Value::Bool(false),
            ]
        );
        // Equal magnitude: int before float, never Equal.
        assert_eq!(Value::Int(2).cmp(&Value::Float(2.0)), Ordering::Less);
    }

    #[test]
    fn test_key_comparison() {
        assert!(Key::Int(1) < Key::Int(2));
        assert!(Key::Int(2) < Key::Float(2.5));
        assert_eq!(Key::Int(3), Key::Float(3.0));
        assert!(Value::Text("x".into()).key().is_none());
        assert!(Value::Float(f64::NAN).key().is_none());
    }

    #[test]
    fn test_column_type_parsing() {
        assert_eq!("INTEGER".parse::<ColumnType>().unwrap(), ColumnType::Int);
        assert_eq!("bigint".parse::<ColumnType>().unwrap(), ColumnType::Int);
        assert_eq!(
            "DOUBLE PRECISION".parse::<ColumnType>().unwrap(),
            ColumnType::Float
        );
        assert_eq!("varchar(255)".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("BOOLEAN".parse::<ColumnType>().unwrap(), ColumnType::Bool);
        assert!("".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(ColumnType::Int.parse_value("42").unwrap(), Value::Int(42));
        assert_eq!(ColumnType::Int.parse_value("").unwrap(), Value::Null);
        assert_eq!(ColumnType::Bool.parse_value("t").unwrap(), Value::Bool(true));
        assert!(ColumnType::Int.parse_value("abc").is_err());
    }

    #[test]
    fn test_schema_resolution() {
        let schema = Schema::new(vec![
            Column::new("ID", ColumnType::Text),
            Column::new("created_utc", ColumnType::Int),
        ])
        .unwrap();
        assert_eq!(schema.id_index(), 0);
        assert_eq!(schema.resolve("CREATED_UTC").unwrap(), 1);
        assert!(matches!(
            schema.resolve("missing"),
            Err(Error::InvalidArgument(_))
        ));

        let no_id = Schema::new(vec![Column::new("name", ColumnType::Text)]);
        assert!(no_id.is_err());
    }
}

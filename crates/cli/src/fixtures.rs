//! Fixture loading.
//!
//! - Header: a JSON object mapping column names to SQL type names, in
//!   declaration order, e.g. `{"id": "TEXT", "created_utc": "BIGINT"}`
//! - Data: CSV with a header row, JSON Lines (one object per row) or a JSON
//!   array of objects
//! - Insert: a single JSON object

use anyhow::{anyhow, bail, Context, Result};
use partcore::{Column, ColumnType, Row, Schema, Value};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::Path;

/// Parses a header document into a schema.
pub fn parse_header(text: &str) -> Result<Schema> {
    let header: Map<String, Json> =
        serde_json::from_str(text).context("header must be a JSON object")?;
    let mut columns = Vec::with_capacity(header.len());
    for (name, ty) in header {
        let ty = ty
            .as_str()
            .ok_or_else(|| anyhow!("type of column '{name}' must be a string"))?;
        columns.push(Column::new(name, ty.parse::<ColumnType>()?));
    }
    Ok(Schema::new(columns)?)
}

pub fn load_header(path: &Path) -> Result<Schema> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading header {}", path.display()))?;
    parse_header(&text).with_context(|| format!("parsing header {}", path.display()))
}

/// Converts one JSON object into a row shaped by `schema`.
///
/// Missing fields and empty strings become nulls.
pub fn row_from_json(schema: &Schema, object: &Map<String, Json>) -> Result<Row> {
    let mut values = Vec::with_capacity(schema.len());
    for column in schema.columns() {
        let field = object.get(&column.name).unwrap_or(&Json::Null);
        let value = convert(column, field)
            .with_context(|| format!("column '{}'", column.name))?;
        values.push(value);
    }
    Ok(Row::new(values))
}

fn convert(column: &Column, field: &Json) -> Result<Value> {
    let value = match (column.ty, field) {
        (_, Json::Null) => Value::Null,
        (ty, Json::String(raw)) => ty.parse_value(raw)?,
        (ColumnType::Int, Json::Number(n)) => Value::Int(
            n.as_i64()
                .ok_or_else(|| anyhow!("{n} is not a 64-bit integer"))?,
        ),
        (ColumnType::Float, Json::Number(n)) => {
            Value::Float(n.as_f64().ok_or_else(|| anyhow!("{n} is not a number"))?)
        }
        (ColumnType::Text, Json::Number(n)) => Value::Text(n.to_string()),
        (ColumnType::Bool, Json::Bool(b)) => Value::Bool(*b),
        (ColumnType::Text, Json::Bool(b)) => Value::Text(b.to_string()),
        (ty, other) => bail!("cannot store {other} in a {ty:?} column"),
    };
    Ok(value)
}

/// Parses a data document (JSON Lines or a JSON array) into rows.
pub fn parse_rows(schema: &Schema, text: &str) -> Result<Vec<Row>> {
    if text.trim_start().starts_with('[') {
        let objects: Vec<Map<String, Json>> =
            serde_json::from_str(text).context("data array must hold JSON objects")?;
        return objects
            .iter()
            .enumerate()
            .map(|(i, object)| row_from_json(schema, object).with_context(|| format!("row {i}")))
            .collect();
    }

    let mut rows = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let object: Map<String, Json> = serde_json::from_str(line)
            .with_context(|| format!("line {} is not a JSON object", line_no + 1))?;
        rows.push(row_from_json(schema, &object).with_context(|| format!("line {}", line_no + 1))?);
    }
    Ok(rows)
}

/// Parses CSV data whose first record names the columns.
///
/// Fields are matched to the schema by header name, so column order in the
/// file is free. Unquoted empty fields become nulls.
pub fn parse_csv_rows(schema: &Schema, text: &str) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers().context("reading CSV header row")?.clone();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("CSV record {}", i + 1))?;
        let object: Map<String, Json> = headers
            .iter()
            .zip(record.iter())
            .map(|(name, field)| (name.to_string(), Json::String(field.to_string())))
            .collect();
        rows.push(row_from_json(schema, &object).with_context(|| format!("CSV record {}", i + 1))?);
    }
    Ok(rows)
}

/// Loads a data file, choosing CSV for a `.csv` extension and JSON otherwise.
pub fn load_rows(schema: &Schema, path: &Path) -> Result<Vec<Row>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading data {}", path.display()))?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let rows = if is_csv {
        parse_csv_rows(schema, &text)
    } else {
        parse_rows(schema, &text)
    };
    rows.with_context(|| format!("parsing data {}", path.display()))
}

/// Loads a single row to insert.
pub fn load_insert(schema: &Schema, path: &Path) -> Result<Row> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading insert {}", path.display()))?;
    let object: Map<String, Json> = serde_json::from_str(&text)
        .with_context(|| format!("insert {} must be a JSON object", path.display()))?;
    row_from_json(schema, &object)
}

//! Decoding of Spanner wire values into canonical [`Value`]s.
//!
//! The decoder is driven by the column's canonical type (produced by the
//! same mapping table that discovery uses), so a row can only be read
//! after its table's schema is known.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as WireValue;

use crate::core::schema::{ColumnType, Schema};
use crate::core::statement::ResultRow;
use crate::core::value::{Row, Value};
use crate::error::{CatalogError, Result};

/// Decode one raw result row against `schema`.
///
/// Every schema column must be present in the result. The row's key holds
/// the primary-key values in key order.
pub fn materialize(schema: &Schema, raw: &ResultRow) -> Result<Row> {
    let mut row = Row::default();
    for column in &schema.columns {
        let cell = raw.column_by_name(&column.name)?;
        let value = decode_value(&column.name, column.column_type, cell)?;
        row.values.insert(column.name.clone(), value);
    }

    if let Some(pk) = &schema.primary_key {
        row.key = pk
            .column_names
            .iter()
            .map(|name| row.values.get(name).cloned().unwrap_or(Value::Null))
            .collect();
    }
    Ok(row)
}

/// Decode a single cell for a column of `column_type`.
pub fn decode_value(column: &str, column_type: ColumnType, cell: &WireValue) -> Result<Value> {
    if cell.is_null() {
        return Ok(Value::Null);
    }
    match column_type.element_type() {
        Some(element) => match cell {
            WireValue::Array(items) => items
                .iter()
                .map(|item| decode_scalar(column, element, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Err(mismatch(column, column_type, other)),
        },
        None => decode_scalar(column, column_type, cell),
    }
}

fn decode_scalar(column: &str, column_type: ColumnType, cell: &WireValue) -> Result<Value> {
    let decoded = match (column_type, cell) {
        (_, WireValue::Null) => Some(Value::Null),

        // INT64 is a decimal string on the wire
        (ColumnType::Int, WireValue::String(s)) => s.parse::<i64>().ok().map(Value::Int),
        (ColumnType::Int, WireValue::Number(n)) => n.as_i64().map(Value::Int),

        (ColumnType::Float, WireValue::Number(n)) => n.as_f64().map(Value::Float),
        (ColumnType::Float, WireValue::String(s)) => match s.as_str() {
            "NaN" => Some(Value::Float(f64::NAN)),
            "Infinity" => Some(Value::Float(f64::INFINITY)),
            "-Infinity" => Some(Value::Float(f64::NEG_INFINITY)),
            _ => None,
        },

        (ColumnType::Datetime, WireValue::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Value::Datetime(dt.with_timezone(&Utc))),

        (ColumnType::Date, WireValue::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(Value::Date),

        (ColumnType::Bool, WireValue::Bool(b)) => Some(Value::Bool(*b)),

        (ColumnType::String, WireValue::String(s)) => Some(Value::String(s.clone())),

        (ColumnType::Bytes, WireValue::String(s)) => STANDARD.decode(s).ok().map(Value::Bytes),

        _ => None,
    };
    decoded.ok_or_else(|| mismatch(column, column_type, cell))
}

fn mismatch(column: &str, column_type: ColumnType, cell: &WireValue) -> CatalogError {
    let mut shown = cell.to_string();
    if shown.len() > 64 {
        let mut end = 64;
        while !shown.is_char_boundary(end) {
            end -= 1;
        }
        shown.truncate(end);
        shown.push_str("...");
    }
    CatalogError::decode(column, format!("expected {} value, got {}", column_type, shown))
}

//! Type mapping from Spanner native types to canonical column types.

use crate::core::schema::ColumnType;
use crate::error::{CatalogError, Result};

/// Array element prefixes, checked after the scalar rules.
const ARRAY_PREFIXES: [(&str, ColumnType); 7] = [
    ("ARRAY<STRING", ColumnType::StringArray),
    ("ARRAY<BYTES", ColumnType::BytesArray),
    ("ARRAY<DATE", ColumnType::DateArray),
    ("ARRAY<FLOAT64", ColumnType::FloatArray),
    ("ARRAY<INT64", ColumnType::IntArray),
    ("ARRAY<TIMESTAMP", ColumnType::DatetimeArray),
    ("ARRAY<BOOL", ColumnType::BoolArray),
];

/// Map a Spanner type name (as reported by `INFORMATION_SCHEMA.COLUMNS.SPANNER_TYPE`)
/// to a canonical column type.
///
/// Rules are ordered and the first match wins. `STRING` and `BYTES` are
/// prefix matches so length-parameterized forms such as `STRING(MAX)` and
/// `BYTES(1024)` are covered; array rules tolerate the same trailing
/// parameterization. Anything else is a [`CatalogError::Mapping`] carrying
/// the offending type name.
pub fn spanner_type_to_column_type(spanner_type: &str) -> Result<ColumnType> {
    match spanner_type {
        "INT64" => return Ok(ColumnType::Int),
        "FLOAT64" => return Ok(ColumnType::Float),
        "TIMESTAMP" => return Ok(ColumnType::Datetime),
        "DATE" => return Ok(ColumnType::Date),
        "BOOL" => return Ok(ColumnType::Bool),
        _ => {}
    }

    if spanner_type.starts_with("STRING") {
        return Ok(ColumnType::String);
    }
    if spanner_type.starts_with("BYTES") {
        return Ok(ColumnType::Bytes);
    }

    ARRAY_PREFIXES
        .iter()
        .find(|(prefix, _)| spanner_type.starts_with(prefix))
        .map(|(_, column_type)| *column_type)
        .ok_or_else(|| CatalogError::Mapping(spanner_type.to_string()))
}

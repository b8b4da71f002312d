//! Canonical cell values and materialized rows.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use super::schema::ColumnType;

/// A single cell value expressed in the canonical type system.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL (for any column type).
    Null,
    Int(i64),
    Float(f64),
    /// Timestamp, always UTC.
    Datetime(DateTime<Utc>),
    Date(NaiveDate),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Array value; elements may be [`Value::Null`].
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check whether this value is acceptable for a column of `column_type`.
    ///
    /// NULL is accepted everywhere; arrays check every element.
    #[must_use]
    pub fn conforms_to(&self, column_type: ColumnType) -> bool {
        match (self, column_type) {
            (Value::Null, _) => true,
            (Value::Int(_), ColumnType::Int)
            | (Value::Float(_), ColumnType::Float)
            | (Value::Datetime(_), ColumnType::Datetime)
            | (Value::Date(_), ColumnType::Date)
            | (Value::Bool(_), ColumnType::Bool)
            | (Value::String(_), ColumnType::String)
            | (Value::Bytes(_), ColumnType::Bytes) => true,
            (Value::Array(items), t) => match t.element_type() {
                Some(elem) => items.iter().all(|v| !v.is_array() && v.conforms_to(elem)),
                None => false,
            },
            _ => false,
        }
    }

    fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Datetime(v) => {
                serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Date(v) => serializer.serialize_str(&v.format("%Y-%m-%d").to_string()),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_str(&STANDARD.encode(v)),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Datetime(v)
    }
}

/// A materialized table row.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Row {
    /// Values keyed by column name.
    pub values: BTreeMap<String, Value>,

    /// Primary-key values in key column order (empty without a primary key).
    pub key: Vec<Value>,
}

impl Row {
    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conforms_to_scalars() {
        assert!(Value::Int(1).conforms_to(ColumnType::Int));
        assert!(!Value::Int(1).conforms_to(ColumnType::Float));
        assert!(Value::Null.conforms_to(ColumnType::BytesArray));
        assert!(!Value::String("x".into()).conforms_to(ColumnType::StringArray));
    }

    #[test]
    fn test_conforms_to_arrays() {
        let arr = Value::Array(vec![Value::Int(1), Value::Null, Value::Int(3)]);
        assert!(arr.conforms_to(ColumnType::IntArray));
        assert!(!arr.conforms_to(ColumnType::FloatArray));
        assert!(!arr.conforms_to(ColumnType::Int));

        let nested = Value::Array(vec![Value::Array(vec![])]);
        assert!(!nested.conforms_to(ColumnType::IntArray));
    }

    #[test]
    fn test_value_json() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let v = Value::Array(vec![Value::Date(date), Value::Null]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"["2024-02-29",null]"#);

        let bytes = Value::Bytes(b"hi".to_vec());
        assert_eq!(serde_json::to_string(&bytes).unwrap(), r#""aGk=""#);
    }

    #[test]
    fn test_row_get() {
        let mut row = Row::default();
        row.values.insert("id".into(), Value::Int(7));
        assert_eq!(row.get("id"), Some(&Value::Int(7)));
        assert_eq!(row.get("missing"), None);
    }
}

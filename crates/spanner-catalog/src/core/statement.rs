//! Statements sent to a session and the raw rows it streams back.
//!
//! Cells are carried in Spanner's JSON wire encoding (`INT64` as a decimal
//! string, `BYTES` as base64, and so on) so that every session
//! implementation hands the engine the same shape.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as WireValue;

use crate::error::{CatalogError, Result};

/// Typed query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    String(String),
    Int64(i64),
    Bool(bool),
}

impl Param {
    /// Spanner type code of the parameter.
    pub fn type_code(&self) -> &'static str {
        match self {
            Param::String(_) => "STRING",
            Param::Int64(_) => "INT64",
            Param::Bool(_) => "BOOL",
        }
    }

    /// Wire encoding of the parameter value.
    pub fn to_wire(&self) -> WireValue {
        match self {
            Param::String(v) => WireValue::String(v.clone()),
            // INT64 travels as a decimal string
            Param::Int64(v) => WireValue::String(v.to_string()),
            Param::Bool(v) => WireValue::Bool(*v),
        }
    }

    /// String payload, if this is a string parameter.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::String(v) => Some(v),
            _ => None,
        }
    }
}

/// A SQL statement with named parameters (`@name` placeholders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: BTreeMap<String, Param>,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: BTreeMap::new(),
        }
    }

    /// Bind a named parameter.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: Param) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Look up a bound parameter.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    /// Short description for error context (first line of SQL, trimmed).
    pub fn summary(&self) -> String {
        let sql = self.sql.split_whitespace().collect::<Vec<_>>().join(" ");
        if sql.len() > 80 {
            let mut end = 80;
            while !sql.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &sql[..end])
        } else {
            sql
        }
    }
}

/// A raw result row: column names shared across the result set plus cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    fields: Arc<[String]>,
    values: Vec<WireValue>,
}

impl ResultRow {
    /// Create a row. `values` must line up with `fields`.
    pub fn new(fields: Arc<[String]>, values: Vec<WireValue>) -> Result<Self> {
        if fields.len() != values.len() {
            return Err(CatalogError::query(
                format!(
                    "row has {} cells but result declares {} columns",
                    values.len(),
                    fields.len()
                ),
                "result row",
            ));
        }
        Ok(Self { fields, values })
    }

    /// Column names of the result set.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell by index.
    pub fn get(&self, idx: usize) -> Option<&WireValue> {
        self.values.get(idx)
    }

    /// Cell by column name.
    pub fn column_by_name(&self, name: &str) -> Result<&WireValue> {
        self.fields
            .iter()
            .position(|f| f == name)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| {
                CatalogError::query(format!("column {} not in result", name), "result row")
            })
    }

    /// Non-null STRING cell by column name.
    pub fn string_by_name(&self, name: &str) -> Result<String> {
        match self.column_by_name(name)? {
            WireValue::String(s) => Ok(s.clone()),
            other => Err(CatalogError::query(
                format!("column {} is not a string: {}", name, other),
                "result row",
            )),
        }
    }

    /// Non-null INT64 cell by column name.
    ///
    /// Accepts the decimal-string wire form and plain JSON integers.
    pub fn int64_by_name(&self, name: &str) -> Result<i64> {
        let cell = self.column_by_name(name)?;
        let parsed = match cell {
            WireValue::String(s) => s.parse::<i64>().ok(),
            WireValue::Number(n) => n.as_i64(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            CatalogError::query(
                format!("column {} is not an INT64: {}", name, cell),
                "result row",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bind_params() {
        let stmt = Statement::new("SELECT 1 WHERE t = @tableName")
            .bind("tableName", Param::String("Singers".into()));
        assert_eq!(stmt.param("tableName").and_then(Param::as_str), Some("Singers"));
        assert!(!stmt.sql.contains("Singers"));
    }

    #[test]
    fn test_param_wire_encoding() {
        assert_eq!(Param::Int64(42).to_wire(), json!("42"));
        assert_eq!(Param::Int64(42).type_code(), "INT64");
        assert_eq!(Param::Bool(true).to_wire(), json!(true));
    }

    #[test]
    fn test_summary_collapses_whitespace() {
        let stmt = Statement::new("SELECT a,\n       b\n  FROM t");
        assert_eq!(stmt.summary(), "SELECT a, b FROM t");
    }

    #[test]
    fn test_row_accessors() {
        let row = ResultRow::new(
            fields(&["TABLE_NAME", "ORDINAL_POSITION"]),
            vec![json!("Singers"), json!("3")],
        )
        .unwrap();
        assert_eq!(row.string_by_name("TABLE_NAME").unwrap(), "Singers");
        assert_eq!(row.int64_by_name("ORDINAL_POSITION").unwrap(), 3);
        assert!(row.column_by_name("MISSING").is_err());
        assert!(row.int64_by_name("TABLE_NAME").is_err());
    }

    #[test]
    fn test_row_rejects_misaligned_cells() {
        let res = ResultRow::new(fields(&["A", "B"]), vec![json!(1)]);
        assert!(matches!(res, Err(CatalogError::Query { .. })));
    }
}

//! Schema and metadata types for tables, columns and primary keys.
//!
//! These types are the database-agnostic surface handed to the tabular
//! toolkit. A [`Schema`] is assembled fresh by every discovery pass and is
//! never mutated afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical column type shared by every adapter of the toolkit.
///
/// The set is closed: every native type an adapter accepts must map onto
/// one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "datetime")]
    Datetime,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "bytes")]
    Bytes,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "int[]")]
    IntArray,
    #[serde(rename = "float[]")]
    FloatArray,
    #[serde(rename = "datetime[]")]
    DatetimeArray,
    #[serde(rename = "date[]")]
    DateArray,
    #[serde(rename = "bool[]")]
    BoolArray,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "bytes[]")]
    BytesArray,
}

impl ColumnType {
    /// Canonical name (e.g. `int`, `string[]`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Datetime => "datetime",
            ColumnType::Date => "date",
            ColumnType::Bool => "bool",
            ColumnType::String => "string",
            ColumnType::Bytes => "bytes",
            ColumnType::Null => "null",
            ColumnType::IntArray => "int[]",
            ColumnType::FloatArray => "float[]",
            ColumnType::DatetimeArray => "datetime[]",
            ColumnType::DateArray => "date[]",
            ColumnType::BoolArray => "bool[]",
            ColumnType::StringArray => "string[]",
            ColumnType::BytesArray => "bytes[]",
        }
    }

    /// Whether values of this type are arrays.
    pub fn is_array(&self) -> bool {
        self.element_type().is_some()
    }

    /// Element type of an array type, `None` for scalars.
    pub fn element_type(&self) -> Option<ColumnType> {
        match self {
            ColumnType::IntArray => Some(ColumnType::Int),
            ColumnType::FloatArray => Some(ColumnType::Float),
            ColumnType::DatetimeArray => Some(ColumnType::Datetime),
            ColumnType::DateArray => Some(ColumnType::Date),
            ColumnType::BoolArray => Some(ColumnType::Bool),
            ColumnType::StringArray => Some(ColumnType::String),
            ColumnType::BytesArray => Some(ColumnType::Bytes),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "PRIMARY")]
    Primary,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Primary => f.write_str("PRIMARY"),
        }
    }
}

/// Table key: its kind plus column names in index ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub key_type: KeyType,
    pub column_names: Vec<String>,
}

impl Key {
    /// Primary key over the given columns.
    pub fn primary<I, S>(column_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_type: KeyType::Primary,
            column_names: column_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the key spans more than one column.
    pub fn is_composite(&self) -> bool {
        self.column_names.len() > 1
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type, self.column_names.join(","))
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Ordinal position (1-based).
    pub ordinal_position: i32,

    /// Canonical column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether the column rejects NULL.
    pub not_null: bool,

    /// Always false for Spanner.
    pub auto_increment: bool,
}

/// Table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Table name.
    pub name: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Primary key, `None` when the table declares none.
    pub primary_key: Option<Key>,
}

impl Schema {
    /// Create an empty schema for a table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
        }
    }

    /// Find a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.primary_key.is_some()
    }
}

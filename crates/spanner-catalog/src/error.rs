//! Error types for the catalog adapter.

use thiserror::Error;

/// Main error type for catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Configuration error (invalid YAML, missing fields, duplicate driver, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session could not be opened or used
    #[error("Connection error: {0}")]
    Connection(String),

    /// Catalog or data query failed while executing or streaming
    #[error("Query failed ({context}): {message}")]
    Query { message: String, context: String },

    /// Native type not covered by the type mapping table
    #[error("Cannot convert spanner type: {0}")]
    Mapping(String),

    /// Requested table is not present in the catalog
    #[error("Schema not found: {0}")]
    NotFound(String),

    /// Operation refused by this adapter
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Operation declared but not available
    #[error("Not implemented: {0}")]
    Unimplemented(String),

    /// Cell value does not match its column's declared type
    #[error("Cannot decode column {column}: {message}")]
    Decode { column: String, message: String },

    /// Operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Operation ran past the caller's deadline
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    /// Create a Query error with context about which statement failed
    pub fn query(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        CatalogError::Query {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Decode error for a column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            CatalogError::Unsupported(_)
                | CatalogError::Unimplemented(_)
                | CatalogError::Mapping(_)
                | CatalogError::NotFound(_)
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            CatalogError::Config(_) | CatalogError::Yaml(_) => 1,
            CatalogError::Connection(_) => 2,
            CatalogError::Query { .. } | CatalogError::Json(_) => 3,
            CatalogError::NotFound(_) => 4,
            CatalogError::Unsupported(_) | CatalogError::Unimplemented(_) => 5,
            CatalogError::Cancelled | CatalogError::DeadlineExceeded => 6,
            CatalogError::Io(_) => 7,
            CatalogError::Mapping(_) | CatalogError::Decode { .. } => 8,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

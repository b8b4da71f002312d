//! # spanner-catalog
//!
//! Schema introspection and type mapping for Cloud Spanner.
//!
//! This library exposes a Spanner database through a small set of
//! database-agnostic traits:
//!
//! - **Schema discovery** from `INFORMATION_SCHEMA` (columns, nullability,
//!   primary keys in key order)
//! - **Type mapping** from Spanner type names to a canonical [`ColumnType`]
//! - **Row reads** decoded into canonical [`Value`]s
//! - **Explicit registry** of adapters via [`DriverCatalog`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use spanner_catalog::{Config, Context, DriverCatalog};
//!
//! #[tokio::main]
//! async fn main() -> spanner_catalog::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let ctx = Context::background();
//!     let catalog = DriverCatalog::with_builtins();
//!     let conn = catalog.open(&config.driver, &ctx, &config.connection).await?;
//!     let schema = conn.get_schema(&ctx, "Singers").await?;
//!     println!("{} has {} columns", schema.name, schema.columns.len());
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod session;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, ConnectionConfig};
pub use crate::core::{
    Column, ColumnType, Connection, Context, Driver, DriverCatalog, Key, KeyType, Row, Schema,
    Session, SessionFactory, Value,
};
pub use drivers::spanner::{SpannerConnection, SpannerDriver, DRIVER_NAME};
pub use error::{CatalogError, Result};
pub use typemap::spanner_type_to_column_type;

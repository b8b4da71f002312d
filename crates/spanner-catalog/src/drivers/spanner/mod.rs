//! Cloud Spanner adapter.
//!
//! - [`SpannerDriver`]: opens connections through a [`SessionFactory`](crate::core::traits::SessionFactory)
//! - [`SpannerConnection`]: schema discovery and row reads over one session
//!
//! Writes are not supported; `set_schema` and `set_rows` always fail with
//! [`CatalogError::Unsupported`](crate::error::CatalogError::Unsupported).

mod connection;
mod discovery;
mod driver;
mod rows;

/// Name the adapter is registered under.
pub const DRIVER_NAME: &str = "spanner";

pub use connection::SpannerConnection;
pub use discovery::{COLUMNS_QUERY, PRIMARY_KEY_QUERY};
pub use driver::SpannerDriver;
pub use rows::decode_value;

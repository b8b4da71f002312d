//! Core traits for the catalog adapter.
//!
//! - [`Session`] / [`RowCursor`]: the injected capability that runs queries
//!   against the remote database
//! - [`SessionFactory`]: opens sessions from a connection descriptor
//! - [`Connection`]: the handle the tabular toolkit talks to
//! - [`Driver`]: the registry entry that produces connections
//!
//! # Design Patterns
//!
//! - **Abstract Factory**: a `Driver` produces a `Connection` bound to a `Session`
//! - **Strategy**: `SessionFactory` swaps the transport (REST, in-memory)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::Result;

use super::context::Context;
use super::schema::Schema;
use super::statement::{ResultRow, Statement};
use super::value::Row;

/// Stream of raw rows produced by one query.
///
/// `next` yields `Ok(None)` at end of stream. `stop` releases the stream;
/// it is called on every exit path, including errors and cancellation.
#[async_trait]
pub trait RowCursor: Send {
    /// Fetch the next row.
    async fn next(&mut self) -> Result<Option<ResultRow>>;

    /// Release the stream. Calling it more than once is harmless.
    async fn stop(&mut self);
}

/// Live session against the database.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run a single-use, read-only query.
    async fn query(&self, stmt: Statement) -> Result<Box<dyn RowCursor>>;

    /// Release the session.
    async fn close(&self);

    /// Whether several queries may stream from this session at once.
    ///
    /// When false, connections serialize query issuance.
    fn supports_concurrent_queries(&self) -> bool {
        false
    }
}

/// Opens sessions from a connection descriptor.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a session. Fails with `Connection` errors; never returns a
    /// half-open session.
    async fn create(&self, ctx: &Context, config: &ConnectionConfig) -> Result<Arc<dyn Session>>;
}

/// Bound connection handle exposed to the tabular toolkit.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Release the session. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Discover every table visible in the catalog.
    ///
    /// This is the batched primitive; prefer it over repeated
    /// [`get_schema`](Connection::get_schema) calls when many schemas are needed.
    async fn discover_all(&self, ctx: &Context) -> Result<HashMap<String, Schema>>;

    /// Schema of a single table.
    ///
    /// Runs a full discovery pass on every call.
    async fn get_schema(&self, ctx: &Context, name: &str) -> Result<Schema>;

    /// Write a schema. Adapters may refuse.
    async fn set_schema(&self, ctx: &Context, name: &str, schema: &Schema) -> Result<()>;

    /// All rows of a table.
    async fn get_rows(&self, ctx: &Context, name: &str) -> Result<Vec<Row>>;

    /// Write rows. Adapters may refuse.
    async fn set_rows(&self, ctx: &Context, name: &str, rows: &[Row]) -> Result<()>;
}

/// Adapter registry entry.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a connection. No handle is returned on failure.
    async fn open(&self, ctx: &Context, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;
}

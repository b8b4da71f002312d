//! Spanner connection handle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::core::context::Context;
use crate::core::schema::Schema;
use crate::core::statement::Statement;
use crate::core::traits::{Connection, Session};
use crate::core::value::Row;
use crate::error::{CatalogError, Result};
use crate::session::for_each_row;

use super::discovery;
use super::rows::materialize;

/// Connection bound to one Spanner session.
///
/// Schema lookups are not cached: every [`get_schema`](Connection::get_schema)
/// runs the full two-pass discovery. Use
/// [`discover_all`](Connection::discover_all) when many schemas are needed.
///
/// When the session cannot stream several queries at once, every operation
/// holds an exclusive lock for its whole sequence of queries.
pub struct SpannerConnection {
    database: String,
    session: Mutex<Option<Arc<dyn Session>>>,
    query_lock: Mutex<()>,
}

impl SpannerConnection {
    /// Wrap an open session.
    pub fn new(database: impl Into<String>, session: Arc<dyn Session>) -> Self {
        Self {
            database: database.into(),
            session: Mutex::new(Some(session)),
            query_lock: Mutex::new(()),
        }
    }

    /// Database path this connection was opened for.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Whether `close` has been called.
    pub async fn is_closed(&self) -> bool {
        self.session.lock().await.is_none()
    }

    /// The live session, or a connection error after close.
    async fn session(&self) -> Result<Arc<dyn Session>> {
        self.session
            .lock()
            .await
            .clone()
            .ok_or_else(|| CatalogError::Connection("connection is closed".into()))
    }

    /// The live session, plus the query lock when the session needs
    /// serialized access. The closed check is repeated once the lock is held.
    async fn acquire(
        &self,
        ctx: &Context,
    ) -> Result<(Arc<dyn Session>, Option<MutexGuard<'_, ()>>)> {
        let session = self.session().await?;
        if session.supports_concurrent_queries() {
            return Ok((session, None));
        }
        let guard = ctx.run(async { Ok(self.query_lock.lock().await) }).await?;
        let session = self.session().await?;
        Ok((session, Some(guard)))
    }

    async fn lookup(&self, session: &dyn Session, ctx: &Context, name: &str) -> Result<Schema> {
        let mut all = discovery::discover_all(session, ctx).await?;
        all.remove(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}

/// Quote a table name as a Spanner identifier.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

#[async_trait]
impl Connection for SpannerConnection {
    async fn close(&self) -> Result<()> {
        let Some(session) = self.session.lock().await.clone() else {
            return Ok(());
        };
        // Wait for an in-flight operation before tearing the session down.
        let _guard = if session.supports_concurrent_queries() {
            None
        } else {
            Some(self.query_lock.lock().await)
        };

        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.close().await;
            debug!("Closed connection to {}", self.database);
        }
        Ok(())
    }

    async fn discover_all(&self, ctx: &Context) -> Result<HashMap<String, Schema>> {
        let (session, _guard) = self.acquire(ctx).await?;
        discovery::discover_all(session.as_ref(), ctx).await
    }

    async fn get_schema(&self, ctx: &Context, name: &str) -> Result<Schema> {
        let (session, _guard) = self.acquire(ctx).await?;
        self.lookup(session.as_ref(), ctx, name).await
    }

    async fn set_schema(&self, _ctx: &Context, name: &str, _schema: &Schema) -> Result<()> {
        Err(CatalogError::Unsupported(format!(
            "Spanner schema changes are not applied through this adapter (table {})",
            name
        )))
    }

    async fn get_rows(&self, ctx: &Context, name: &str) -> Result<Vec<Row>> {
        let (session, _guard) = self.acquire(ctx).await?;

        // The schema drives decoding and proves the table exists before its
        // name goes into SQL.
        let schema = self.lookup(session.as_ref(), ctx, name).await?;
        let stmt = Statement::new(format!("SELECT * FROM {}", quote_identifier(&schema.name)));

        let mut rows = Vec::new();
        for_each_row(session.as_ref(), ctx, stmt, |raw| {
            rows.push(materialize(&schema, &raw)?);
            Ok(())
        })
        .await?;

        debug!("Read {} rows from {}", rows.len(), schema.name);
        Ok(rows)
    }

    async fn set_rows(&self, _ctx: &Context, name: &str, _rows: &[Row]) -> Result<()> {
        Err(CatalogError::Unsupported(format!(
            "Spanner adapter does not support writing rows (table {})",
            name
        )))
    }
}

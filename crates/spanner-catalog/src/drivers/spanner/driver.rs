use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{validate_connection, ConnectionConfig};
use crate::core::context::Context;
use crate::core::traits::{Connection, Driver, SessionFactory};
use crate::error::{CatalogError, Result};

use super::connection::SpannerConnection;

/// Spanner driver. Stateless apart from its session factory.
#[derive(Clone)]
pub struct SpannerDriver {
    factory: Arc<dyn SessionFactory>,
}

impl SpannerDriver {
    /// Driver backed by the Cloud Spanner REST API.
    #[cfg(feature = "rest")]
    pub fn new() -> Self {
        Self::with_session_factory(Arc::new(crate::session::RestSessionFactory))
    }

    /// Driver that opens sessions through `factory`.
    pub fn with_session_factory(factory: Arc<dyn SessionFactory>) -> Self {
        Self { factory }
    }
}

#[cfg(feature = "rest")]
impl Default for SpannerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpannerDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerDriver").finish_non_exhaustive()
    }
}

#[async_trait]
impl Driver for SpannerDriver {
    async fn open(&self, ctx: &Context, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        // A descriptor that cannot name a database is an open failure.
        validate_connection(config).map_err(|e| match e {
            CatalogError::Config(message) => CatalogError::Connection(message),
            other => other,
        })?;
        let session = ctx.run(self.factory.create(ctx, config)).await?;
        info!("Opened Spanner connection to {}", config.database);
        Ok(Box::new(SpannerConnection::new(&config.database, session)))
    }
}

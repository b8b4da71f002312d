//! Driver catalog for explicit dependency injection.
//!
//! The [`DriverCatalog`] maps adapter names to [`Driver`] values. It is
//! constructed by the composing application during startup and passed
//! around explicitly; nothing registers itself as a side effect of being
//! linked in.
//!
//! # Design Rationale
//!
//! - **No global state**: registration is an ordinary function call
//! - **Explicit registration**: clear, deterministic initialization order
//! - **Testable**: easy to build catalogs around in-memory sessions

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::error::{CatalogError, Result};

use super::context::Context;
use super::traits::{Connection, Driver};

/// Registry of adapters by name.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = DriverCatalog::with_builtins();
/// let conn = catalog
///     .open("spanner", &Context::background(), &config.connection)
///     .await?;
/// let schema = conn.get_schema(&Context::background(), "Singers").await?;
/// ```
#[derive(Default)]
pub struct DriverCatalog {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in drivers registered.
    ///
    /// Calling this any number of times yields equivalent catalogs.
    #[cfg(feature = "rest")]
    pub fn with_builtins() -> Self {
        use crate::drivers::spanner::{SpannerDriver, DRIVER_NAME};

        let mut catalog = Self::new();
        catalog
            .drivers
            .insert(DRIVER_NAME.to_string(), Arc::new(SpannerDriver::new()));
        catalog
    }

    /// Register a driver by name.
    ///
    /// Registering a second driver under an existing name is a
    /// configuration error; the original registration stays in place.
    pub fn register(&mut self, name: impl Into<String>, driver: Arc<dyn Driver>) -> Result<()> {
        let name = name.into();
        if self.drivers.contains_key(&name) {
            return Err(CatalogError::Config(format!(
                "Driver already registered: {}",
                name
            )));
        }
        self.drivers.insert(name, driver);
        Ok(())
    }

    /// Get a driver by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(name).cloned()
    }

    /// Get a driver by name, returning an error if not found.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.get(name)
            .ok_or_else(|| CatalogError::Config(format!("Unknown driver: {}", name)))
    }

    /// Check if a driver is registered.
    pub fn has_driver(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Get all registered driver names, sorted.
    pub fn driver_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a driver and open a connection with it.
    pub async fn open(
        &self,
        name: &str,
        ctx: &Context,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn Connection>> {
        let driver = self.require(name)?;
        driver.open(ctx, config).await
    }
}

impl std::fmt::Debug for DriverCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCatalog")
            .field("drivers", &self.driver_names())
            .finish()
    }
}

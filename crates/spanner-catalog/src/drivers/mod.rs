//! Database adapter implementations.
//!
//! - [`spanner`]: Cloud Spanner adapter
//!
//! # Adding New Adapters
//!
//! 1. Create a new module under `drivers/`
//! 2. Implement [`Driver`](crate::core::traits::Driver) and
//!    [`Connection`](crate::core::traits::Connection)
//! 3. Register it in [`DriverCatalog::with_builtins()`](crate::core::DriverCatalog::with_builtins)
//! 4. Gate any network client behind a feature flag in `Cargo.toml`

pub mod spanner;

pub use spanner::{SpannerConnection, SpannerDriver};

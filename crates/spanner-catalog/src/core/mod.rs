//! Core abstractions for the catalog adapter.
//!
//! - [`schema`]: Schema, column, key and canonical type definitions
//! - [`value`]: Canonical cell values and materialized rows
//! - [`statement`]: Statements and raw result rows exchanged with sessions
//! - [`context`]: Per-call cancellation and deadlines
//! - [`traits`]: Session, connection and driver traits
//! - [`catalog`]: Driver registry for dependency injection

pub mod catalog;
pub mod context;
pub mod schema;
pub mod statement;
pub mod traits;
pub mod value;

pub use catalog::DriverCatalog;
pub use context::Context;
pub use schema::{Column, ColumnType, Key, KeyType, Schema};
pub use statement::{Param, ResultRow, Statement};
pub use traits::{Connection, Driver, RowCursor, Session, SessionFactory};
pub use value::{Row, Value};

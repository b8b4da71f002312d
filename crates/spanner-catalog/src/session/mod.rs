//! Session capability implementations.
//!
//! - [`memory`]: In-memory catalog that answers the adapter's queries
//! - [`rest`]: Cloud Spanner REST API session (feature `rest`)
//!
//! [`for_each_row`] is the one place where a cursor is driven; it races
//! every step against the caller's [`Context`] and always stops the cursor.

pub mod memory;
#[cfg(feature = "rest")]
mod partial;
#[cfg(feature = "rest")]
pub mod rest;

pub use memory::{MemoryColumn, MemorySession, MemorySessionFactory, MemoryTable};
#[cfg(feature = "rest")]
pub use rest::{RestSession, RestSessionFactory};

use crate::core::context::Context;
use crate::core::statement::{ResultRow, Statement};
use crate::core::traits::Session;
use crate::error::Result;

/// Run `stmt` and feed every row to `f` until the stream ends.
///
/// The cursor is stopped on every exit path: end of stream, a failing
/// step, an error from `f`, cancellation and deadline expiry.
pub async fn for_each_row<F>(
    session: &dyn Session,
    ctx: &Context,
    stmt: Statement,
    mut f: F,
) -> Result<usize>
where
    F: FnMut(ResultRow) -> Result<()>,
{
    let mut cursor = ctx.run(session.query(stmt)).await?;

    let mut count = 0usize;
    let res = loop {
        match ctx.run(cursor.next()).await {
            Ok(Some(row)) => {
                if let Err(e) = f(row) {
                    break Err(e);
                }
                count += 1;
            }
            Ok(None) => break Ok(count),
            Err(e) => break Err(e),
        }
    };

    cursor.stop().await;
    res
}

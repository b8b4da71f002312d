//! Schema discovery from Spanner's `INFORMATION_SCHEMA`.
//!
//! Two passes:
//!
//! 1. One scan of `INFORMATION_SCHEMA.COLUMNS` for every table in the
//!    default schema, building a [`Schema`] per table.
//! 2. One parameterized `INFORMATION_SCHEMA.INDEX_COLUMNS` lookup per
//!    table to resolve its primary key in index ordinal order.
//!
//! Either the complete map is returned or an error is; a failure at any
//! step discards everything gathered so far.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::context::Context;
use crate::core::schema::{Column, Key, Schema};
use crate::core::statement::{Param, ResultRow, Statement};
use crate::core::traits::Session;
use crate::error::{CatalogError, Result};
use crate::session::for_each_row;
use crate::typemap::spanner_type_to_column_type;

/// Column catalog scan, restricted to the default (unnamed) schema.
pub const COLUMNS_QUERY: &str = "SELECT TABLE_NAME, COLUMN_NAME, ORDINAL_POSITION, SPANNER_TYPE, IS_NULLABLE \
     FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = ''";

/// Primary-key lookup; `@tableName` is bound, never interpolated.
pub const PRIMARY_KEY_QUERY: &str = "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.INDEX_COLUMNS \
     WHERE TABLE_NAME = @tableName AND INDEX_TYPE = 'PRIMARY_KEY' \
     ORDER BY ORDINAL_POSITION ASC";

/// Run both discovery passes and return every table's schema.
pub async fn discover_all(session: &dyn Session, ctx: &Context) -> Result<HashMap<String, Schema>> {
    let mut schemas = load_columns(session, ctx).await?;

    for (table_name, schema) in schemas.iter_mut() {
        schema.primary_key = load_primary_key(session, ctx, table_name).await?;
        if let Some(pk) = &schema.primary_key {
            check_key_columns(schema, pk)?;
        }
    }

    debug!("Discovered {} tables", schemas.len());
    Ok(schemas)
}

/// Pass 1: build schemas from the column catalog.
async fn load_columns(session: &dyn Session, ctx: &Context) -> Result<HashMap<String, Schema>> {
    let mut schemas: HashMap<String, Schema> = HashMap::new();

    let rows = for_each_row(session, ctx, Statement::new(COLUMNS_QUERY), |row| {
        let (table_name, column) = scan_column(&row)?;
        schemas
            .entry(table_name)
            .or_insert_with_key(|name| Schema::new(name.clone()))
            .columns
            .push(column);
        Ok(())
    })
    .await?;

    for schema in schemas.values_mut() {
        schema.columns.sort_by_key(|c| c.ordinal_position);
        check_columns(schema)?;
    }

    debug!(
        "Loaded {} columns across {} tables",
        rows,
        schemas.len()
    );
    Ok(schemas)
}

/// Build a column from one `INFORMATION_SCHEMA.COLUMNS` row.
fn scan_column(row: &ResultRow) -> Result<(String, Column)> {
    let table_name = row.string_by_name("TABLE_NAME")?;
    let name = row.string_by_name("COLUMN_NAME")?;
    let ordinal = row.int64_by_name("ORDINAL_POSITION")?;
    let spanner_type = row.string_by_name("SPANNER_TYPE")?;
    let not_null = row.column_by_name("IS_NULLABLE")?.as_str() == Some("NO");

    let ordinal_position = i32::try_from(ordinal).map_err(|_| {
        CatalogError::query(
            format!("ordinal position {} of {}.{} out of range", ordinal, table_name, name),
            "INFORMATION_SCHEMA.COLUMNS",
        )
    })?;

    let column = Column {
        name,
        ordinal_position,
        column_type: spanner_type_to_column_type(&spanner_type)?,
        not_null,
        // Spanner has no AUTO_INCREMENT
        auto_increment: false,
    };
    Ok((table_name, column))
}

/// Pass 2: primary key of one table, `None` when no key columns come back.
async fn load_primary_key(
    session: &dyn Session,
    ctx: &Context,
    table_name: &str,
) -> Result<Option<Key>> {
    let stmt = Statement::new(PRIMARY_KEY_QUERY)
        .bind("tableName", Param::String(table_name.to_string()));

    let mut column_names = Vec::new();
    for_each_row(session, ctx, stmt, |row| {
        column_names.push(row.string_by_name("COLUMN_NAME")?);
        Ok(())
    })
    .await?;

    let pk = if column_names.is_empty() {
        None
    } else {
        Some(Key::primary(column_names))
    };
    debug!("Primary key for {}: {:?}", table_name, pk);
    Ok(pk)
}

fn check_columns(schema: &Schema) -> Result<()> {
    let mut names = HashSet::new();
    let mut positions = HashSet::new();
    for column in &schema.columns {
        if !names.insert(column.name.as_str()) || !positions.insert(column.ordinal_position) {
            return Err(CatalogError::query(
                format!(
                    "duplicate column {} (position {}) in {}",
                    column.name, column.ordinal_position, schema.name
                ),
                "INFORMATION_SCHEMA.COLUMNS",
            ));
        }
    }
    Ok(())
}

fn check_key_columns(schema: &Schema, pk: &Key) -> Result<()> {
    match pk.column_names.iter().find(|c| schema.column(c).is_none()) {
        Some(missing) => Err(CatalogError::query(
            format!(
                "primary key column {} is not a column of {}",
                missing, schema.name
            ),
            "INFORMATION_SCHEMA.INDEX_COLUMNS",
        )),
        None => Ok(()),
    }
}

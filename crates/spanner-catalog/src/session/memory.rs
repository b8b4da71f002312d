//! In-memory session.
//!
//! [`MemorySession`] holds a set of table fixtures and answers the three
//! statement shapes the adapter issues: the `INFORMATION_SCHEMA.COLUMNS`
//! scan, the parameterized `INFORMATION_SCHEMA.INDEX_COLUMNS` lookup and
//! `SELECT * FROM <table>`. Cells use Spanner's JSON wire encoding.
//!
//! It also records every statement, counts cursors and close calls, and can
//! inject failures or stalls, which makes it the fake database for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as WireValue;

use crate::config::ConnectionConfig;
use crate::core::context::Context;
use crate::core::statement::{ResultRow, Statement};
use crate::core::traits::{RowCursor, Session, SessionFactory};
use crate::error::{CatalogError, Result};

const COLUMNS_VIEW: &str = "INFORMATION_SCHEMA.COLUMNS";
const INDEX_COLUMNS_VIEW: &str = "INFORMATION_SCHEMA.INDEX_COLUMNS";
const SELECT_ALL_PREFIX: &str = "SELECT * FROM ";

/// Column fixture.
#[derive(Debug, Clone)]
pub struct MemoryColumn {
    pub name: String,
    pub spanner_type: String,
    pub nullable: bool,
}

/// Table fixture: columns in declaration order, primary key, data rows.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub name: String,
    pub columns: Vec<MemoryColumn>,
    pub primary_key: Vec<String>,
    pub rows: Vec<Vec<WireValue>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Add a nullable column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, spanner_type: impl Into<String>) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            spanner_type: spanner_type.into(),
            nullable: true,
        });
        self
    }

    /// Add a NOT NULL column.
    #[must_use]
    pub fn not_null_column(
        mut self,
        name: impl Into<String>,
        spanner_type: impl Into<String>,
    ) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            spanner_type: spanner_type.into(),
            nullable: false,
        });
        self
    }

    /// Declare the primary key, in key order.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append a data row; cells line up with the declared columns.
    #[must_use]
    pub fn row(mut self, cells: Vec<WireValue>) -> Self {
        self.rows.push(cells);
        self
    }
}

#[derive(Debug, Clone)]
enum Fault {
    FailQuery(String),
    FailStreamAfter(String, usize),
    PendingAfter(String, usize),
}

#[derive(Debug, Default)]
struct Counters {
    cursors_opened: AtomicUsize,
    cursors_stopped: AtomicUsize,
    closes: AtomicUsize,
}

/// In-memory session over table fixtures.
#[derive(Debug)]
pub struct MemorySession {
    tables: Vec<MemoryTable>,
    faults: Vec<Fault>,
    concurrent: bool,
    scramble_catalog: bool,
    executed: Mutex<Vec<Statement>>,
    counters: Arc<Counters>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    /// Empty catalog.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            faults: Vec::new(),
            concurrent: true,
            scramble_catalog: false,
            executed: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Add a table fixture.
    #[must_use]
    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Fail any query whose SQL contains `sql_fragment` before it streams.
    #[must_use]
    pub fn fail_query(mut self, sql_fragment: impl Into<String>) -> Self {
        self.faults.push(Fault::FailQuery(sql_fragment.into()));
        self
    }

    /// Fail the stream of matching queries after `rows` rows.
    #[must_use]
    pub fn fail_stream_after(mut self, sql_fragment: impl Into<String>, rows: usize) -> Self {
        self.faults
            .push(Fault::FailStreamAfter(sql_fragment.into(), rows));
        self
    }

    /// Stall the stream of matching queries forever after `rows` rows.
    #[must_use]
    pub fn pending_after(mut self, sql_fragment: impl Into<String>, rows: usize) -> Self {
        self.faults.push(Fault::PendingAfter(sql_fragment.into(), rows));
        self
    }

    /// Set whether the session claims to support concurrent queries.
    #[must_use]
    pub fn with_concurrent_queries(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Emit `INFORMATION_SCHEMA.COLUMNS` rows out of order: tables
    /// interleaved round-robin, each table's columns last to first.
    #[must_use]
    pub fn scrambled_catalog(mut self) -> Self {
        self.scramble_catalog = true;
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<Statement> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Number of cursors handed out.
    pub fn cursors_opened(&self) -> usize {
        self.counters.cursors_opened.load(Ordering::SeqCst)
    }

    /// Number of cursors stopped.
    pub fn cursors_stopped(&self) -> usize {
        self.counters.cursors_stopped.load(Ordering::SeqCst)
    }

    /// Number of `close` calls received.
    pub fn close_count(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn answer(&self, stmt: &Statement) -> Result<(Vec<String>, Vec<Vec<WireValue>>)> {
        if stmt.sql.contains(INDEX_COLUMNS_VIEW) {
            let table_name = stmt
                .param("tableName")
                .and_then(|p| p.as_str())
                .ok_or_else(|| {
                    CatalogError::query("missing STRING parameter @tableName", stmt.summary())
                })?;
            let rows = self
                .table(table_name)
                .map(|t| {
                    t.primary_key
                        .iter()
                        .map(|c| vec![WireValue::String(c.clone())])
                        .collect()
                })
                .unwrap_or_default();
            return Ok((vec!["COLUMN_NAME".to_string()], rows));
        }

        if stmt.sql.contains(COLUMNS_VIEW) {
            let fields = [
                "TABLE_NAME",
                "COLUMN_NAME",
                "ORDINAL_POSITION",
                "SPANNER_TYPE",
                "IS_NULLABLE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect();
            let mut per_table: Vec<Vec<Vec<WireValue>>> = self
                .tables
                .iter()
                .map(|t| {
                    t.columns
                        .iter()
                        .enumerate()
                        .map(|(idx, c)| {
                            vec![
                                WireValue::String(t.name.clone()),
                                WireValue::String(c.name.clone()),
                                // INT64 travels as a decimal string
                                WireValue::String((idx + 1).to_string()),
                                WireValue::String(c.spanner_type.clone()),
                                WireValue::String(
                                    if c.nullable { "YES" } else { "NO" }.to_string(),
                                ),
                            ]
                        })
                        .collect()
                })
                .collect();

            let rows = if self.scramble_catalog {
                per_table.iter_mut().for_each(|cols| cols.reverse());
                let longest = per_table.iter().map(Vec::len).max().unwrap_or(0);
                let mut queues: Vec<_> = per_table.into_iter().map(Vec::into_iter).collect();
                let mut rows = Vec::new();
                for _ in 0..longest {
                    rows.extend(queues.iter_mut().filter_map(Iterator::next));
                }
                rows
            } else {
                per_table.into_iter().flatten().collect()
            };
            return Ok((fields, rows));
        }

        if let Some(ident) = stmt.sql.trim().strip_prefix(SELECT_ALL_PREFIX) {
            let name = unquote_identifier(ident.trim());
            let table = self.table(&name).ok_or_else(|| {
                CatalogError::query(format!("Table not found: {}", name), stmt.summary())
            })?;
            let fields = table.columns.iter().map(|c| c.name.clone()).collect();
            return Ok((fields, table.rows.clone()));
        }

        Err(CatalogError::query(
            "statement not supported by in-memory session",
            stmt.summary(),
        ))
    }
}

fn unquote_identifier(ident: &str) -> String {
    match ident.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        Some(inner) => inner.replace("\\`", "`").replace("\\\\", "\\"),
        None => ident.to_string(),
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn query(&self, stmt: Statement) -> Result<Box<dyn RowCursor>> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(stmt.clone());
        }

        let mut fail_after = None;
        let mut pending_after = None;
        for fault in &self.faults {
            match fault {
                Fault::FailQuery(frag) if stmt.sql.contains(frag.as_str()) => {
                    return Err(CatalogError::query("injected query failure", stmt.summary()));
                }
                Fault::FailStreamAfter(frag, n) if stmt.sql.contains(frag.as_str()) => {
                    fail_after = Some(*n);
                }
                Fault::PendingAfter(frag, n) if stmt.sql.contains(frag.as_str()) => {
                    pending_after = Some(*n);
                }
                _ => {}
            }
        }

        let (fields, rows) = self.answer(&stmt)?;
        self.counters.cursors_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemoryCursor {
            fields: fields.into(),
            rows: rows.into(),
            emitted: 0,
            fail_after,
            pending_after,
            context: stmt.summary(),
            counters: self.counters.clone(),
            stopped: false,
        }))
    }

    async fn close(&self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn supports_concurrent_queries(&self) -> bool {
        self.concurrent
    }
}

struct MemoryCursor {
    fields: Arc<[String]>,
    rows: VecDeque<Vec<WireValue>>,
    emitted: usize,
    fail_after: Option<usize>,
    pending_after: Option<usize>,
    context: String,
    counters: Arc<Counters>,
    stopped: bool,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    async fn next(&mut self) -> Result<Option<ResultRow>> {
        if self.stopped {
            return Ok(None);
        }
        if self.fail_after == Some(self.emitted) {
            return Err(CatalogError::query(
                "injected stream failure",
                self.context.clone(),
            ));
        }
        if self.pending_after == Some(self.emitted) {
            std::future::pending::<()>().await;
        }
        match self.rows.pop_front() {
            Some(cells) => {
                self.emitted += 1;
                ResultRow::new(self.fields.clone(), cells).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.rows.clear();
            self.counters.cursors_stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Session factory that hands out a shared [`MemorySession`].
pub struct MemorySessionFactory {
    session: Option<Arc<MemorySession>>,
    failure: String,
}

impl MemorySessionFactory {
    /// Factory returning `session` on every open.
    pub fn new(session: Arc<MemorySession>) -> Self {
        Self {
            session: Some(session),
            failure: String::new(),
        }
    }

    /// Factory whose every open fails with a connection error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            session: None,
            failure: message.into(),
        }
    }
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    async fn create(&self, _ctx: &Context, _config: &ConnectionConfig) -> Result<Arc<dyn Session>> {
        match &self.session {
            Some(session) => Ok(session.clone() as Arc<dyn Session>),
            None => Err(CatalogError::Connection(self.failure.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::statement::Param;
    use serde_json::json;

    fn singers() -> MemoryTable {
        MemoryTable::new("Singers")
            .not_null_column("SingerId", "INT64")
            .column("Name", "STRING(MAX)")
            .primary_key(["SingerId"])
            .row(vec![json!("1"), json!("Marc")])
    }

    async fn drain(cursor: &mut Box<dyn RowCursor>) -> Vec<ResultRow> {
        let mut rows = Vec::new();
        while let Some(row) = cursor.next().await.unwrap() {
            rows.push(row);
        }
        rows
    }

    #[tokio::test]
    async fn test_columns_query() {
        let session = MemorySession::new().with_table(singers());
        let mut cursor = session
            .query(Statement::new(
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = ''",
            ))
            .await
            .unwrap();
        let rows = drain(&mut cursor).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].string_by_name("COLUMN_NAME").unwrap(), "Name");
        assert_eq!(rows[1].int64_by_name("ORDINAL_POSITION").unwrap(), 2);
        assert_eq!(rows[0].string_by_name("IS_NULLABLE").unwrap(), "NO");
    }

    #[tokio::test]
    async fn test_index_query_requires_param() {
        let session = MemorySession::new().with_table(singers());
        let sql = "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.INDEX_COLUMNS WHERE TABLE_NAME = @tableName";

        assert!(session.query(Statement::new(sql)).await.is_err());

        let mut cursor = session
            .query(Statement::new(sql).bind("tableName", Param::String("Singers".into())))
            .await
            .unwrap();
        let rows = drain(&mut cursor).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].string_by_name("COLUMN_NAME").unwrap(), "SingerId");
    }

    #[tokio::test]
    async fn test_select_all_with_quoted_identifier() {
        let session = MemorySession::new().with_table(singers());
        let mut cursor = session
            .query(Statement::new("SELECT * FROM `Singers`"))
            .await
            .unwrap();
        let rows = drain(&mut cursor).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields(), &["SingerId".to_string(), "Name".to_string()]);

        assert!(session
            .query(Statement::new("SELECT * FROM `Albums`"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_scrambled_catalog_interleaves_tables() {
        let session = MemorySession::new()
            .with_table(singers())
            .with_table(MemoryTable::new("Albums").column("AlbumId", "INT64"))
            .scrambled_catalog();
        let mut cursor = session
            .query(Statement::new("SELECT * FROM INFORMATION_SCHEMA.COLUMNS"))
            .await
            .unwrap();
        let order: Vec<_> = drain(&mut cursor)
            .await
            .iter()
            .map(|r| r.string_by_name("COLUMN_NAME").unwrap())
            .collect();
        assert_eq!(order, vec!["Name", "AlbumId", "SingerId"]);
    }

    #[tokio::test]
    async fn test_fail_stream_after() {
        let session = MemorySession::new()
            .with_table(singers())
            .fail_stream_after("INFORMATION_SCHEMA.COLUMNS", 1);
        let mut cursor = session
            .query(Statement::new("SELECT * FROM INFORMATION_SCHEMA.COLUMNS"))
            .await
            .unwrap();
        assert!(cursor.next().await.unwrap().is_some());
        assert!(cursor.next().await.is_err());
    }

    #[tokio::test]
    async fn test_records_statements_and_closes() {
        let session = MemorySession::new().with_table(singers());
        let _ = session.query(Statement::new("SELECT * FROM Singers")).await;
        session.close().await;
        session.close().await;
        assert_eq!(session.executed().len(), 1);
        assert_eq!(session.close_count(), 2);
    }

    #[test]
    fn test_unquote_identifier() {
        assert_eq!(unquote_identifier("`Singers`"), "Singers");
        assert_eq!(unquote_identifier("`we\\`ird`"), "we`ird");
        assert_eq!(unquote_identifier("Plain"), "Plain");
    }
}

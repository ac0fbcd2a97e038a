//! SQLite connection wrapper
//!
//! Wraps a pooled rusqlite connection. The connection is returned to the pool
//! when dropped.

use std::ops::Deref;
use std::sync::Arc;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection as RusqliteConnection, Row, Statement as RusqliteStatement, ToSql};
use tracing::{instrument, warn};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;

/// Pooled SQLite connection
pub struct SqliteConnection {
    inner: PooledConnection<SqliteConnectionManager>,
    metrics: Arc<StorageMetrics>,
}

impl SqliteConnection {
    /// Create a new connection wrapper from a pooled connection
    pub fn new(
        conn: PooledConnection<SqliteConnectionManager>,
        metrics: Arc<StorageMetrics>,
    ) -> Self {
        Self { inner: conn, metrics }
    }

    /// Execute a statement that doesn't return rows
    #[instrument(skip(self, params), fields(sql = %sql))]
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> StorageResult<usize> {
        self.inner.execute(sql, params).map_err(StorageError::from)
    }

    /// Execute a SQL query that returns a single row
    #[instrument(skip(self, params, f), fields(sql = %sql))]
    pub fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> StorageResult<T>
    where
        F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        self.inner.query_row(sql, params, f).map_err(StorageError::from)
    }

    /// Like [`Self::query_row`] but maps "no rows" to `None`
    pub fn query_optional<T, F>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        f: F,
    ) -> StorageResult<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        match self.query_row(sql, params, f) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Prepare a SQL statement
    #[instrument(skip(self), fields(sql = %sql))]
    pub fn prepare(&self, sql: &str) -> StorageResult<SqliteStatement<'_>> {
        let stmt = self.inner.prepare(sql).map_err(StorageError::from)?;
        Ok(SqliteStatement::new(stmt))
    }

    /// Start an immediate-mode transaction that owns this connection
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so two transactions
    /// touching the same record are serialized instead of failing at commit
    /// time.
    #[instrument(skip(self))]
    pub fn begin_immediate(self) -> StorageResult<ImmediateTransaction> {
        self.inner.execute_batch("BEGIN IMMEDIATE").map_err(StorageError::from)?;
        Ok(ImmediateTransaction { conn: self, finished: false })
    }
}

impl Deref for SqliteConnection {
    type Target = RusqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Prepared statement wrapper
pub struct SqliteStatement<'conn> {
    inner: RusqliteStatement<'conn>,
}

impl<'conn> SqliteStatement<'conn> {
    /// Create a new statement wrapper
    pub fn new(stmt: RusqliteStatement<'conn>) -> Self {
        Self { inner: stmt }
    }

    /// Execute the statement with parameters
    pub fn execute(&mut self, params: &[&dyn ToSql]) -> StorageResult<usize> {
        self.inner.execute(params).map_err(StorageError::from)
    }

    /// Query with the statement and collect every mapped row
    pub fn query_map<T, F>(&mut self, params: &[&dyn ToSql], mut f: F) -> StorageResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        let rows = self.inner.query_map(params, |row| f(row)).map_err(StorageError::from)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }
}

/// Transaction that owns its pooled connection
///
/// Rolls back on drop unless [`ImmediateTransaction::commit`] succeeded, so an
/// early return through `?` never leaves partial writes behind.
pub struct ImmediateTransaction {
    conn: SqliteConnection,
    finished: bool,
}

impl ImmediateTransaction {
    /// Connection the transaction runs on
    pub fn connection(&self) -> &SqliteConnection {
        &self.conn
    }

    /// Commit every statement executed since `BEGIN IMMEDIATE`
    pub fn commit(mut self) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::TransactionFinished);
        }
        self.conn.inner.execute_batch("COMMIT").map_err(StorageError::from)?;
        self.finished = true;
        self.conn.metrics.record_commit();
        Ok(())
    }

    /// Explicitly discard the transaction
    pub fn rollback(mut self) -> StorageResult<()> {
        self.finish_with_rollback()
    }

    fn finish_with_rollback(&mut self) -> StorageResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.metrics.record_rollback();
        self.conn.inner.execute_batch("ROLLBACK").map_err(StorageError::from)
    }
}

impl Deref for ImmediateTransaction {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl Drop for ImmediateTransaction {
    fn drop(&mut self) {
        if let Err(err) = self.finish_with_rollback() {
            warn!(error = %err, "rollback of abandoned transaction failed");
        }
    }
}

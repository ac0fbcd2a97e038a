//! Database connection manager backed by the shared SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use caseledger_common::storage::{
    HealthStatus, SqliteConnection, SqlitePool, SqlitePoolConfig, StorageError,
};
use caseledger_domain::{CaseLedgerError, DatabaseConfig, Result};
use rusqlite::params;
use tracing::{info, warn};

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");
/// Store transactions and directory reads each hold a connection.
const MIN_POOL_SIZE: u32 = 2;

/// Database manager that wraps an [`SqlitePool`].
pub struct DbManager {
    pool: Arc<SqlitePool>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and default timeouts.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        Self::with_pool_config(db_path, SqlitePoolConfig::default().with_max_size(pool_size))
    }

    /// Create a manager from the `[database]` configuration section.
    ///
    /// # Errors
    /// `Config` if `pool_size` is below the two connections the services
    /// hold at once.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if config.pool_size < MIN_POOL_SIZE {
            return Err(CaseLedgerError::Config(format!(
                "database.pool_size must be at least {MIN_POOL_SIZE}, got {}",
                config.pool_size
            )));
        }

        let pool_config = SqlitePoolConfig {
            connection_timeout: Duration::from_secs(config.connection_timeout_secs),
            ..SqlitePoolConfig::default()
        }
        .with_max_size(config.pool_size)
        .with_busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        Self::with_pool_config(&config.path, pool_config)
    }

    fn with_pool_config<P: AsRef<Path>>(db_path: P, config: SqlitePoolConfig) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        if config.max_size < MIN_POOL_SIZE {
            warn!(
                max_size = config.max_size,
                "pool smaller than 2 connections; orphan reconciliation will time out"
            );
        }
        let pool = Arc::new(SqlitePool::new(&path, config).map_err(InfraError::from)?);

        info!(
            db_path = %path.display(),
            max_connections = pool.metrics().max_pool_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Borrow the underlying SQLite pool.
    pub fn pool(&self) -> &Arc<SqlitePool> {
        &self.pool
    }

    /// Acquire a SQLite connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        Ok(self.pool.get_connection().map_err(InfraError::from)?)
    }

    /// Ensure the full schema exists on the current database.
    ///
    /// # Errors
    /// `StoreFailure` if the file was written by a newer schema version.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        info!(version = SCHEMA_VERSION, "schema migrations applied");
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform a health check to verify database connectivity.
    ///
    /// Acquires a connection and runs a trivial query; pool occupancy is
    /// reported alongside.
    pub fn health_check(&self) -> Result<HealthStatus> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(InfraError::from)?;
        drop(conn);
        Ok(self.pool.health_check())
    }
}

fn create_schema(conn: &SqliteConnection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(InfraError::from)?;

    let found: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", params![], |row| row.get(0))
        .map_err(InfraError::from)?;
    if let Some(found) = found.filter(|v| *v > SCHEMA_VERSION) {
        return Err(InfraError::from(StorageError::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        })
        .into());
    }

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(InfraError::from)?;
    Ok(())
}

//! SQLite-backed `EntityDirectory`.
//!
//! The directory is owned by whatever system manages users and work items;
//! that system keeps these two tables in sync through the upsert/remove
//! methods. Orphan reconciliation only ever reads them.

use std::sync::Arc;

use caseledger_core::store::EntityDirectory;
use caseledger_domain::{Result, WorkItemKind};
use rusqlite::params;
use tracing::debug;

use super::manager::DbManager;
use crate::errors::InfraError;

/// Directory of known users and work items.
pub struct SqliteEntityDirectory {
    db: Arc<DbManager>,
}

impl SqliteEntityDirectory {
    /// Create a directory backed by the shared pool.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register a user; a no-op if already present.
    pub fn upsert_user(&self, user_id: &str) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute("INSERT OR IGNORE INTO directory_users (user_id) VALUES (?1)", params![user_id])
            .map_err(InfraError::from)?;
        Ok(())
    }

    /// Forget a user. Returns `false` if the user wasn't registered.
    pub fn remove_user(&self, user_id: &str) -> Result<bool> {
        let conn = self.db.get_connection()?;
        let removed = conn
            .execute("DELETE FROM directory_users WHERE user_id = ?1", params![user_id])
            .map_err(InfraError::from)?;
        debug!(user_id, removed, "directory user removed");
        Ok(removed > 0)
    }

    /// Register a work item; a no-op if already present.
    pub fn upsert_work_item(&self, kind: WorkItemKind, work_item_id: &str) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT OR IGNORE INTO directory_work_items (kind, work_item_id) VALUES (?1, ?2)",
            params![kind.as_str(), work_item_id],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    /// Forget a work item. Returns `false` if it wasn't registered.
    pub fn remove_work_item(&self, kind: WorkItemKind, work_item_id: &str) -> Result<bool> {
        let conn = self.db.get_connection()?;
        let removed = conn
            .execute(
                "DELETE FROM directory_work_items WHERE kind = ?1 AND work_item_id = ?2",
                params![kind.as_str(), work_item_id],
            )
            .map_err(InfraError::from)?;
        debug!(%kind, work_item_id, removed, "directory work item removed");
        Ok(removed > 0)
    }
}

impl EntityDirectory for SqliteEntityDirectory {
    fn user_exists(&self, user_id: &str) -> Result<bool> {
        let conn = self.db.get_connection()?;
        let found = conn
            .query_optional(
                "SELECT 1 FROM directory_users WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, i32>(0),
            )
            .map_err(InfraError::from)?;
        Ok(found.is_some())
    }

    fn work_item_exists(&self, kind: WorkItemKind, work_item_id: &str) -> Result<bool> {
        let conn = self.db.get_connection()?;
        let found = conn
            .query_optional(
                "SELECT 1 FROM directory_work_items WHERE kind = ?1 AND work_item_id = ?2",
                params![kind.as_str(), work_item_id],
                |row| row.get::<_, i32>(0),
            )
            .map_err(InfraError::from)?;
        Ok(found.is_some())
    }
}

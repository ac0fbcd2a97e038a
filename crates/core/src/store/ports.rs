//! Port interfaces for work-item persistence
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.
//!
//! Every operation in the core runs inside exactly one [`StoreTransaction`].
//! A transaction that is dropped without [`StoreTransaction::commit`] rolls
//! back, so returning early with `?` never leaves partial writes behind.

use caseledger_domain::{
    ArchiveRecord, AuditEntry, Result, StoreFilter, WorkItemKind, WorkItemRecord,
};
use tracing::debug;

/// Durable store for live records, archives and the audit trail
pub trait WorkItemStore: Send + Sync {
    /// Open a transaction
    ///
    /// Two open transactions never interleave writes to the same record; the
    /// second one waits (or fails with `StoreFailure` once the adapter's
    /// timeout expires).
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;
}

/// One atomic unit of work against a [`WorkItemStore`]
pub trait StoreTransaction {
    // Live records
    fn get_live(&self, record_id: &str) -> Result<Option<WorkItemRecord>>;
    fn find_live_by_work_item(&self, work_item_id: &str) -> Result<Option<WorkItemRecord>>;
    /// Insert or replace a live record together with its control rows
    fn put_live(&mut self, record: &WorkItemRecord) -> Result<()>;
    /// Delete a live record and its control rows; `false` if it didn't exist
    fn delete_live(&mut self, record_id: &str) -> Result<bool>;
    fn list_live(&self, filter: &StoreFilter) -> Result<Vec<WorkItemRecord>>;

    // Archives
    fn get_archive(&self, archive_id: &str) -> Result<Option<ArchiveRecord>>;
    /// Unrestored archive currently standing in for `work_item_id`
    fn find_active_archive(&self, work_item_id: &str) -> Result<Option<ArchiveRecord>>;
    /// Insert or replace an archive record
    fn put_archive(&mut self, archive: &ArchiveRecord) -> Result<()>;
    /// Delete an archive record; `false` if it didn't exist
    fn delete_archive(&mut self, archive_id: &str) -> Result<bool>;
    fn list_archive(&self, filter: &StoreFilter) -> Result<Vec<ArchiveRecord>>;

    // Audit trail (append-only)
    fn append_audit(&mut self, entry: &AuditEntry) -> Result<()>;
    /// The `PermanentlyDeleted` entry for `archive_id`, if it was purged
    fn find_purge(&self, archive_id: &str) -> Result<Option<AuditEntry>>;
    fn audit_for_work_item(&self, work_item_id: &str) -> Result<Vec<AuditEntry>>;

    /// Make every write in this transaction durable
    fn commit(self: Box<Self>) -> Result<()>;
}

/// External directory of users and work items
///
/// Consulted by orphan reconciliation to decide which rows lost their owner or
/// their underlying work item.
pub trait EntityDirectory: Send + Sync {
    fn user_exists(&self, user_id: &str) -> Result<bool>;
    fn work_item_exists(&self, kind: WorkItemKind, work_item_id: &str) -> Result<bool>;
}

/// Run `op` inside a fresh transaction and commit if it succeeds
///
/// On error the transaction is dropped, which rolls it back.
pub fn atomically<S, T, F>(store: &S, op: F) -> Result<T>
where
    S: WorkItemStore + ?Sized,
    F: FnOnce(&mut (dyn StoreTransaction + '_)) -> Result<T>,
{
    let mut tx = store.begin()?;

    match op(tx.as_mut()) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            debug!(error = %err, kind = err.label(), "transaction rolled back");
            Err(err)
        }
    }
}

//! In-memory implementations of the core ports
//!
//! `InMemoryWorkItemStore` holds its state behind one mutex. A transaction
//! keeps the lock for its whole lifetime and works on a copy, which it writes
//! back only on commit. That gives the same serialization and rollback
//! behaviour as the SQLite adapter's `BEGIN IMMEDIATE`.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use caseledger_core::store::{EntityDirectory, StoreTransaction, WorkItemStore};
use caseledger_domain::{
    ArchiveRecord, AuditAction, AuditEntry, CaseLedgerError, Result as DomainResult, StoreFilter,
    WorkItemKind, WorkItemRecord,
};
use parking_lot::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct StoreState {
    live: BTreeMap<String, WorkItemRecord>,
    archives: BTreeMap<String, ArchiveRecord>,
    audit: Vec<AuditEntry>,
}

/// In-memory mock for `WorkItemStore`.
#[derive(Debug, Default)]
pub struct InMemoryWorkItemStore {
    state: Mutex<StoreState>,
    fail_audit_appends: AtomicBool,
}

impl InMemoryWorkItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append_audit` fail with `StoreFailure`.
    pub fn fail_audit_appends(&self, fail: bool) {
        self.fail_audit_appends.store(fail, Ordering::SeqCst);
    }

    pub fn live_records(&self) -> Vec<WorkItemRecord> {
        self.state.lock().live.values().cloned().collect()
    }

    pub fn archives(&self) -> Vec<ArchiveRecord> {
        self.state.lock().archives.values().cloned().collect()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().audit.clone()
    }

    /// Seed an archive directly, bypassing the engine.
    pub fn insert_archive(&self, archive: ArchiveRecord) {
        self.state.lock().archives.insert(archive.id.clone(), archive);
    }
}

impl WorkItemStore for InMemoryWorkItemStore {
    fn begin(&self) -> DomainResult<Box<dyn StoreTransaction + '_>> {
        let guard = self.state.lock();
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            fail_audit: self.fail_audit_appends.load(Ordering::SeqCst),
        }))
    }
}

struct InMemoryTransaction<'a> {
    guard: MutexGuard<'a, StoreState>,
    working: StoreState,
    fail_audit: bool,
}

impl StoreTransaction for InMemoryTransaction<'_> {
    fn get_live(&self, record_id: &str) -> DomainResult<Option<WorkItemRecord>> {
        Ok(self.working.live.get(record_id).cloned())
    }

    fn find_live_by_work_item(&self, work_item_id: &str) -> DomainResult<Option<WorkItemRecord>> {
        Ok(self.working.live.values().find(|r| r.work_item_id == work_item_id).cloned())
    }

    fn put_live(&mut self, record: &WorkItemRecord) -> DomainResult<()> {
        self.working.live.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete_live(&mut self, record_id: &str) -> DomainResult<bool> {
        Ok(self.working.live.remove(record_id).is_some())
    }

    fn list_live(&self, filter: &StoreFilter) -> DomainResult<Vec<WorkItemRecord>> {
        Ok(self.working.live.values().filter(|r| filter.matches_live(r)).cloned().collect())
    }

    fn get_archive(&self, archive_id: &str) -> DomainResult<Option<ArchiveRecord>> {
        Ok(self.working.archives.get(archive_id).cloned())
    }

    fn find_active_archive(&self, work_item_id: &str) -> DomainResult<Option<ArchiveRecord>> {
        Ok(self
            .working
            .archives
            .values()
            .find(|a| a.original_work_item_id == work_item_id && !a.is_restored())
            .cloned())
    }

    fn put_archive(&mut self, archive: &ArchiveRecord) -> DomainResult<()> {
        self.working.archives.insert(archive.id.clone(), archive.clone());
        Ok(())
    }

    fn delete_archive(&mut self, archive_id: &str) -> DomainResult<bool> {
        Ok(self.working.archives.remove(archive_id).is_some())
    }

    fn list_archive(&self, filter: &StoreFilter) -> DomainResult<Vec<ArchiveRecord>> {
        Ok(self.working.archives.values().filter(|a| filter.matches_archive(a)).cloned().collect())
    }

    fn append_audit(&mut self, entry: &AuditEntry) -> DomainResult<()> {
        if self.fail_audit {
            return Err(CaseLedgerError::StoreFailure("audit trail unavailable".to_string()));
        }
        self.working.audit.push(entry.clone());
        Ok(())
    }

    fn find_purge(&self, archive_id: &str) -> DomainResult<Option<AuditEntry>> {
        Ok(self
            .working
            .audit
            .iter()
            .find(|e| e.action == AuditAction::PermanentlyDeleted && e.subject_id == archive_id)
            .cloned())
    }

    fn audit_for_work_item(&self, work_item_id: &str) -> DomainResult<Vec<AuditEntry>> {
        Ok(self
            .working
            .audit
            .iter()
            .filter(|e| e.original_work_item_id == work_item_id)
            .cloned()
            .collect())
    }

    fn commit(self: Box<Self>) -> DomainResult<()> {
        let InMemoryTransaction { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }
}

/// In-memory mock for `EntityDirectory`.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: Mutex<HashSet<String>>,
    work_items: Mutex<HashSet<(WorkItemKind, String)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: &str) {
        self.users.lock().insert(user_id.to_string());
    }

    pub fn remove_user(&self, user_id: &str) {
        self.users.lock().remove(user_id);
    }

    pub fn add_work_item(&self, kind: WorkItemKind, work_item_id: &str) {
        self.work_items.lock().insert((kind, work_item_id.to_string()));
    }

    pub fn remove_work_item(&self, kind: WorkItemKind, work_item_id: &str) {
        self.work_items.lock().remove(&(kind, work_item_id.to_string()));
    }
}

impl EntityDirectory for InMemoryDirectory {
    fn user_exists(&self, user_id: &str) -> DomainResult<bool> {
        Ok(self.users.lock().contains(user_id))
    }

    fn work_item_exists(&self, kind: WorkItemKind, work_item_id: &str) -> DomainResult<bool> {
        Ok(self.work_items.lock().contains(&(kind, work_item_id.to_string())))
    }
}

//! Archive engine - archival, restoration and purge business logic
//!
//! A work item is represented either by a live record or by an unrestored
//! archive, never both. Every transition here swaps one representation for
//! the other (or removes the last one) inside a single store transaction and
//! appends the matching audit entry in that same transaction.

use std::sync::Arc;

use caseledger_common::time::Clock;
use caseledger_domain::constants::MAX_REASON_LENGTH;
use caseledger_domain::{
    Action, Actor, ArchivePolicyConfig, ArchiveRecord, AuditAction, AuditEntry, CaseLedgerError,
    ControlData, LifecycleState, OriginalData, ReconciliationReport, Resource, Restoration,
    Result, StoreFilter, WorkItemKind, WorkItemRecord,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::snapshot;
use crate::access::PermissionEngine;
use crate::store::{atomically, EntityDirectory, StoreTransaction, WorkItemStore};
use crate::tracking::ledger;
use crate::tracking::service::live_not_found;

/// Archive lifecycle engine
pub struct ArchiveEngine {
    store: Arc<dyn WorkItemStore>,
    directory: Arc<dyn EntityDirectory>,
    clock: Arc<dyn Clock>,
    permissions: PermissionEngine,
    policy: ArchivePolicyConfig,
}

impl ArchiveEngine {
    /// Create a new archive engine with the default policy
    pub fn new(
        store: Arc<dyn WorkItemStore>,
        directory: Arc<dyn EntityDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            permissions: PermissionEngine::new(),
            policy: ArchivePolicyConfig::default(),
        }
    }

    /// Override the archive policy
    #[must_use]
    pub fn with_policy(mut self, policy: ArchivePolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Move a `Done` record out of the live set into a new archive
    ///
    /// A running timer is stopped and its minutes committed before the
    /// snapshot is taken. Returns the new archive id.
    ///
    /// # Errors
    /// - `NotFound` if the record doesn't exist
    /// - `Forbidden` without `archive.create` for the record owner
    /// - `NotEligibleForArchive` unless the record is `Done`
    pub fn archive(&self, actor: &Actor, record_id: &str, reason: Option<&str>) -> Result<String> {
        let now = self.clock.now();

        let archive = atomically(self.store.as_ref(), |tx| {
            let Some(mut record) = tx.get_live(record_id)? else {
                self.permissions.require_any(actor, Resource::Archive, Action::Create)?;
                return Err(live_not_found(record_id));
            };
            self.permissions.authorize(
                actor,
                Resource::Archive,
                Action::Create,
                &record.owner_user_id,
            )?;
            let reason = normalize_reason(reason)?;

            if !record.status.is_archivable() {
                return Err(CaseLedgerError::NotEligibleForArchive(record.status.to_string()));
            }
            if record.timer.is_running {
                ledger::stop(&mut record, now)?;
            }

            let archive = ArchiveRecord {
                id: Uuid::now_v7().to_string(),
                original_work_item_id: record.work_item_id.clone(),
                kind: record.kind(),
                original_data: OriginalData::capture(&record),
                control_data: ControlData::capture(&record),
                archived_by: actor.user_id.clone(),
                archived_at: now,
                archive_reason: reason.clone(),
                restoration: None,
            };

            tx.put_archive(&archive)?;
            tx.delete_live(&record.id)?;
            tx.append_audit(&audit(
                AuditAction::Archived,
                actor,
                now,
                reason.clone(),
                &archive.id,
                &archive.original_work_item_id,
                archive.kind,
            ))?;
            Ok(archive)
        })?;

        info!(
            archive_id = %archive.id,
            record_id,
            work_item_id = %archive.original_work_item_id,
            minutes = archive.control_data.total_time_minutes,
            actor = %actor.user_id,
            "work item archived"
        );
        Ok(archive.id)
    }

    /// Bring an archive back as a new `Pending` live record
    ///
    /// The archive row stays; only its restoration fields are set.
    ///
    /// # Errors
    /// - `NotFound` if the archive doesn't exist (or was purged)
    /// - `Forbidden` without `archive.restore` for the original owner
    /// - `AlreadyRestored` if it was restored before
    /// - `InvalidSnapshot` if the snapshot can't be rehydrated
    pub fn restore(
        &self,
        actor: &Actor,
        archive_id: &str,
        reason: Option<&str>,
    ) -> Result<WorkItemRecord> {
        let now = self.clock.now();

        let record = atomically(self.store.as_ref(), |tx| {
            let mut archive = self.load_archive(tx, actor, archive_id, Action::Restore)?;
            let reason = normalize_reason(reason)?;

            if archive.is_restored() {
                return Err(CaseLedgerError::AlreadyRestored(archive.id.clone()));
            }
            snapshot::validate(&archive)?;
            if let Some(live) = tx.find_live_by_work_item(&archive.original_work_item_id)? {
                return Err(CaseLedgerError::Conflict(format!(
                    "work item {} is already live as record {}",
                    archive.original_work_item_id, live.id
                )));
            }

            let record = snapshot::rehydrate(&archive, Uuid::now_v7().to_string(), now);
            archive.restoration = Some(Restoration {
                restored_at: now,
                restored_by: actor.user_id.clone(),
                restored_record_id: record.id.clone(),
            });

            tx.put_live(&record)?;
            tx.put_archive(&archive)?;
            tx.append_audit(&audit(
                AuditAction::Restored,
                actor,
                now,
                reason.clone(),
                &archive.id,
                &archive.original_work_item_id,
                archive.kind,
            ))?;
            Ok(record)
        })?;

        info!(
            archive_id,
            record_id = %record.id,
            minutes = record.total_time_minutes,
            actor = %actor.user_id,
            "archive restored"
        );
        Ok(record)
    }

    /// Remove an archive for good
    ///
    /// The audit entry is appended before the row is removed, in the same
    /// transaction. Nothing can be restored afterwards.
    ///
    /// # Errors
    /// - `Forbidden` without `archive.delete` for the original owner
    /// - `InvalidInput` if policy requires a reason and none was given
    /// - `AlreadyDeleted` if the archive was purged before
    /// - `NotFound` if it never existed
    pub fn permanently_delete(
        &self,
        actor: &Actor,
        archive_id: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        let now = self.clock.now();

        let archive = atomically(self.store.as_ref(), |tx| {
            let archive = match tx.get_archive(archive_id)? {
                Some(archive) => archive,
                None => {
                    self.permissions.require_any(actor, Resource::Archive, Action::Delete)?;
                    return Err(match tx.find_purge(archive_id)? {
                        Some(_) => CaseLedgerError::AlreadyDeleted(archive_id.to_string()),
                        None => not_found(archive_id),
                    });
                }
            };
            self.permissions.authorize(
                actor,
                Resource::Archive,
                Action::Delete,
                archive.owner_user_id(),
            )?;
            let reason = normalize_reason(reason)?;
            if self.policy.require_delete_reason && reason.is_none() {
                return Err(CaseLedgerError::InvalidInput(
                    "a reason is required for permanent deletion".to_string(),
                ));
            }

            tx.append_audit(&audit(
                AuditAction::PermanentlyDeleted,
                actor,
                now,
                reason.clone(),
                &archive.id,
                &archive.original_work_item_id,
                archive.kind,
            ))?;
            tx.delete_archive(&archive.id)?;
            Ok(archive)
        })?;

        info!(
            archive_id,
            work_item_id = %archive.original_work_item_id,
            actor = %actor.user_id,
            "archive permanently deleted"
        );
        Ok(())
    }

    /// Remove live records and archives whose owner or work item no longer
    /// exists in the entity directory
    ///
    /// Requires `system.maintain_all`. Running it again without new orphans
    /// removes nothing.
    pub fn reconcile_orphans(&self, actor: &Actor) -> Result<ReconciliationReport> {
        self.permissions.authorize_admin(actor, Resource::System, Action::Maintain)?;
        let now = self.clock.now();

        let report = atomically(self.store.as_ref(), |tx| {
            let mut report = ReconciliationReport::default();

            for record in tx.list_live(&StoreFilter::unrestricted())? {
                if self.is_orphan(&record.owner_user_id, record.kind(), &record.work_item_id)? {
                    tx.delete_live(&record.id)?;
                    tx.append_audit(&audit(
                        AuditAction::OrphanRemoved,
                        actor,
                        now,
                        Some("live record orphaned".to_string()),
                        &record.id,
                        &record.work_item_id,
                        record.kind(),
                    ))?;
                    report.live_removed += 1;
                }
            }

            for archive in tx.list_archive(&StoreFilter::unrestricted())? {
                if self.is_orphan(archive.owner_user_id(), archive.kind, &archive.original_work_item_id)? {
                    tx.delete_archive(&archive.id)?;
                    tx.append_audit(&audit(
                        AuditAction::OrphanRemoved,
                        actor,
                        now,
                        Some("archive orphaned".to_string()),
                        &archive.id,
                        &archive.original_work_item_id,
                        archive.kind,
                    ))?;
                    report.archived_removed += 1;
                }
            }

            Ok(report)
        })?;

        if report.total() > 0 {
            warn!(
                live_removed = report.live_removed,
                archived_removed = report.archived_removed,
                actor = %actor.user_id,
                "orphaned rows removed"
            );
        } else {
            info!(actor = %actor.user_id, "no orphaned rows found");
        }
        Ok(report)
    }

    /// Where `archive_id` sits in the archive lifecycle
    ///
    /// # Errors
    /// `NotFound` if the id never existed; `Forbidden` without `archive.view`.
    pub fn lifecycle(&self, actor: &Actor, archive_id: &str) -> Result<LifecycleState> {
        atomically(self.store.as_ref(), |tx| match tx.get_archive(archive_id)? {
            Some(archive) => {
                self.permissions.authorize(
                    actor,
                    Resource::Archive,
                    Action::View,
                    archive.owner_user_id(),
                )?;
                Ok(if archive.is_restored() {
                    LifecycleState::Restored
                } else {
                    LifecycleState::Archived
                })
            }
            None => {
                self.permissions.require_any(actor, Resource::Archive, Action::View)?;
                match tx.find_purge(archive_id)? {
                    Some(_) => Ok(LifecycleState::Gone),
                    None => Err(not_found(archive_id)),
                }
            }
        })
    }

    /// Audit trail for one work item, oldest first
    ///
    /// Requires `archive.view` at `all` scope since entries may reference rows
    /// that no longer exist.
    pub fn audit_trail(&self, actor: &Actor, work_item_id: &str) -> Result<Vec<AuditEntry>> {
        self.permissions.authorize_admin(actor, Resource::Archive, Action::View)?;
        atomically(self.store.as_ref(), |tx| tx.audit_for_work_item(work_item_id))
    }

    /// Load an archive and authorize `action` against its owner
    ///
    /// A missing id still requires some grant for `action`, so callers
    /// without any grant can't probe for existence.
    fn load_archive(
        &self,
        tx: &dyn StoreTransaction,
        actor: &Actor,
        archive_id: &str,
        action: Action,
    ) -> Result<ArchiveRecord> {
        let Some(archive) = tx.get_archive(archive_id)? else {
            self.permissions.require_any(actor, Resource::Archive, action)?;
            return Err(not_found(archive_id));
        };

        self.permissions.authorize(actor, Resource::Archive, action, archive.owner_user_id())?;
        Ok(archive)
    }

    fn is_orphan(&self, owner_user_id: &str, kind: WorkItemKind, work_item_id: &str) -> Result<bool> {
        Ok(!self.directory.user_exists(owner_user_id)?
            || !self.directory.work_item_exists(kind, work_item_id)?)
    }
}

fn normalize_reason(reason: Option<&str>) -> Result<Option<String>> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    if let Some(r) = reason {
        if r.len() > MAX_REASON_LENGTH {
            return Err(CaseLedgerError::InvalidInput(format!(
                "reason exceeds {MAX_REASON_LENGTH} characters"
            )));
        }
    }
    Ok(reason.map(str::to_string))
}

fn not_found(archive_id: &str) -> CaseLedgerError {
    CaseLedgerError::NotFound(format!("archive record {archive_id}"))
}

fn audit(
    action: AuditAction,
    actor: &Actor,
    occurred_at: DateTime<Utc>,
    reason: Option<String>,
    subject_id: &str,
    original_work_item_id: &str,
    kind: WorkItemKind,
) -> AuditEntry {
    AuditEntry {
        id: Uuid::now_v7().to_string(),
        action,
        actor_user_id: actor.user_id.clone(),
        occurred_at,
        reason,
        subject_id: subject_id.to_string(),
        original_work_item_id: original_work_item_id.to_string(),
        kind,
    }
}

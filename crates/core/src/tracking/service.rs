//! Work-item service - live record business logic
//!
//! Assignment, status changes, timer control and manual time. Each call runs
//! in one store transaction: load the record, authorize against its owner,
//! apply the transition, write it back.

use std::sync::Arc;

use caseledger_common::time::Clock;
use caseledger_domain::{
    Action, Actor, CaseLedgerError, ManualEntryRequest, ManualTimeEntry, NewAssignment, Result,
    StatusChange, Timer, TimerSession, WorkItemKind, WorkItemRecord, WorkItemStatus,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::ledger;
use crate::access::PermissionEngine;
use crate::store::{atomically, StoreTransaction, WorkItemStore};

/// Live work-item service
pub struct WorkItemService {
    store: Arc<dyn WorkItemStore>,
    clock: Arc<dyn Clock>,
    permissions: PermissionEngine,
}

impl WorkItemService {
    /// Create a new work-item service
    pub fn new(store: Arc<dyn WorkItemStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, permissions: PermissionEngine::new() }
    }

    /// Put a work item into the live set as a `Pending` record
    ///
    /// Authorized as `<kind>.create` against the new owner.
    ///
    /// # Errors
    /// `Conflict` if the work item already has a live record or an unrestored
    /// archive.
    pub fn assign(&self, actor: &Actor, assignment: NewAssignment) -> Result<WorkItemRecord> {
        let kind = assignment.item.kind();
        self.permissions.authorize(
            actor,
            kind.resource(),
            Action::Create,
            &assignment.owner_user_id,
        )?;

        let work_item_id = require_id("work_item_id", assignment.work_item_id)?;
        let owner_user_id = require_id("owner_user_id", assignment.owner_user_id)?;
        let assignee_user_id = match assignment.assignee_user_id {
            Some(assignee) => require_id("assignee_user_id", assignee)?,
            None => owner_user_id.clone(),
        };

        let now = self.clock.now();
        let record = WorkItemRecord {
            id: Uuid::now_v7().to_string(),
            work_item_id,
            item: assignment.item,
            owner_user_id,
            assignee_user_id,
            status: WorkItemStatus::Pending,
            timer: Timer::stopped(),
            total_time_minutes: 0,
            carried_over_minutes: 0,
            assigned_at: now,
            status_history: Vec::new(),
            timer_sessions: Vec::new(),
            manual_entries: Vec::new(),
        };

        atomically(self.store.as_ref(), |tx| {
            ensure_not_represented(tx, &record.work_item_id)?;
            tx.put_live(&record)
        })?;

        info!(
            record_id = %record.id,
            work_item_id = %record.work_item_id,
            kind = %kind,
            actor = %actor.user_id,
            "work item assigned"
        );
        Ok(record)
    }

    /// Fetch a live record, authorized as `<kind>.view`
    pub fn get(&self, actor: &Actor, record_id: &str) -> Result<WorkItemRecord> {
        atomically(self.store.as_ref(), |tx| self.load_authorized(tx, actor, record_id, Action::View))
    }

    /// Change who the record is assigned to
    pub fn reassign(
        &self,
        actor: &Actor,
        record_id: &str,
        assignee_user_id: &str,
    ) -> Result<WorkItemRecord> {
        let assignee = require_id("assignee_user_id", assignee_user_id.to_string())?;

        let (record, ()) = self.mutate(actor, record_id, Action::Update, |record, _| {
            record.assignee_user_id = assignee;
            Ok(())
        })?;

        info!(
            record_id,
            assignee = %record.assignee_user_id,
            actor = %actor.user_id,
            "work item reassigned"
        );
        Ok(record)
    }

    /// Move the record to `status`
    ///
    /// Any status may follow any other. Setting the current status again
    /// records nothing.
    pub fn change_status(
        &self,
        actor: &Actor,
        record_id: &str,
        status: WorkItemStatus,
    ) -> Result<WorkItemRecord> {
        let (record, changed) = self.mutate(actor, record_id, Action::Update, |record, now| {
            if record.status == status {
                return Ok(false);
            }
            record.status_history.push(StatusChange {
                from: record.status,
                to: status,
                changed_by: actor.user_id.clone(),
                changed_at: now,
            });
            record.status = status;
            Ok(true)
        })?;

        if changed {
            info!(record_id, %status, actor = %actor.user_id, "work item status changed");
        }
        Ok(record)
    }

    /// Start the record's timer
    pub fn start_timer(&self, actor: &Actor, record_id: &str) -> Result<WorkItemRecord> {
        let (record, ()) =
            self.mutate(actor, record_id, Action::TrackTime, |record, now| ledger::start(record, now))?;

        info!(record_id, actor = %actor.user_id, "timer started");
        Ok(record)
    }

    /// Pause the record's timer and commit the elapsed minutes
    pub fn pause_timer(&self, actor: &Actor, record_id: &str) -> Result<TimerSession> {
        self.end_timer(actor, record_id, ledger::pause)
    }

    /// Stop the record's timer and commit the elapsed minutes
    pub fn stop_timer(&self, actor: &Actor, record_id: &str) -> Result<TimerSession> {
        self.end_timer(actor, record_id, ledger::stop)
    }

    /// Log time by hand
    pub fn add_manual_entry(
        &self,
        actor: &Actor,
        record_id: &str,
        request: ManualEntryRequest,
    ) -> Result<ManualTimeEntry> {
        let (record, entry) = self.mutate(actor, record_id, Action::TrackTime, |record, now| {
            ledger::add_manual_entry(record, request, Uuid::now_v7().to_string(), &actor.user_id, now)
        })?;

        info!(
            record_id,
            minutes = entry.duration_minutes,
            total = record.total_time_minutes,
            actor = %actor.user_id,
            "manual time added"
        );
        Ok(entry)
    }

    fn end_timer(
        &self,
        actor: &Actor,
        record_id: &str,
        end: fn(&mut WorkItemRecord, DateTime<Utc>) -> Result<TimerSession>,
    ) -> Result<TimerSession> {
        let (record, session) = self.mutate(actor, record_id, Action::TrackTime, end)?;

        info!(
            record_id,
            minutes = session.minutes,
            total = record.total_time_minutes,
            closed = session.closed,
            actor = %actor.user_id,
            "timer ended"
        );
        Ok(session)
    }

    /// Load, authorize, apply `change` and write back in one transaction
    fn mutate<R, F>(
        &self,
        actor: &Actor,
        record_id: &str,
        action: Action,
        change: F,
    ) -> Result<(WorkItemRecord, R)>
    where
        F: FnOnce(&mut WorkItemRecord, DateTime<Utc>) -> Result<R>,
    {
        let now = self.clock.now();

        atomically(self.store.as_ref(), |tx| {
            let mut record = self.load_authorized(tx, actor, record_id, action)?;
            let outcome = change(&mut record, now)?;
            tx.put_live(&record)?;
            Ok((record, outcome))
        })
    }

    /// Load a live record and authorize `action` against its owner
    ///
    /// A missing id is only reported as `NotFound` to actors holding some
    /// grant for `action` on a work-item kind; everyone else gets `Forbidden`.
    fn load_authorized(
        &self,
        tx: &dyn StoreTransaction,
        actor: &Actor,
        record_id: &str,
        action: Action,
    ) -> Result<WorkItemRecord> {
        let Some(record) = tx.get_live(record_id)? else {
            self.permissions.require_any_of(
                actor,
                WorkItemKind::ALL.iter().map(|kind| kind.resource()),
                action,
            )?;
            return Err(live_not_found(record_id));
        };

        self.permissions.authorize(actor, record.kind().resource(), action, &record.owner_user_id)?;
        Ok(record)
    }
}

pub(crate) fn live_not_found(record_id: &str) -> CaseLedgerError {
    CaseLedgerError::NotFound(format!("work item record {record_id}"))
}

/// Fail with `Conflict` if the work item is already live or archived
fn ensure_not_represented(tx: &dyn StoreTransaction, work_item_id: &str) -> Result<()> {
    if let Some(live) = tx.find_live_by_work_item(work_item_id)? {
        return Err(CaseLedgerError::Conflict(format!(
            "work item {work_item_id} is already live as record {}",
            live.id
        )));
    }
    if let Some(archive) = tx.find_active_archive(work_item_id)? {
        return Err(CaseLedgerError::Conflict(format!(
            "work item {work_item_id} is archived as {}",
            archive.id
        )));
    }
    Ok(())
}

fn require_id(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CaseLedgerError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

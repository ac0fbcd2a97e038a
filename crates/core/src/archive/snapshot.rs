//! Snapshot validation and rehydration

use caseledger_domain::constants::SNAPSHOT_VERSION;
use caseledger_domain::{
    ArchiveRecord, CaseLedgerError, Result, Timer, WorkItemRecord, WorkItemStatus,
};
use chrono::{DateTime, Utc};

/// Check that an archive can be turned back into a live record
///
/// # Errors
/// `InvalidSnapshot` naming the first inconsistency found.
pub fn validate(archive: &ArchiveRecord) -> Result<()> {
    let original = &archive.original_data;
    let control = &archive.control_data;

    if original.version != SNAPSHOT_VERSION || control.version != SNAPSHOT_VERSION {
        return Err(invalid(
            archive,
            format!(
                "unsupported snapshot version {}/{} (expected {SNAPSHOT_VERSION})",
                original.version, control.version
            ),
        ));
    }
    if original.item.kind() != archive.kind {
        return Err(invalid(
            archive,
            format!("kind {} does not match payload kind {}", archive.kind, original.item.kind()),
        ));
    }
    if original.work_item_id != archive.original_work_item_id {
        return Err(invalid(archive, "work item id does not match snapshot".to_string()));
    }
    if original.owner_user_id.trim().is_empty() {
        return Err(invalid(archive, "snapshot has no owner".to_string()));
    }
    Ok(())
}

/// Build the live record a restoration creates
///
/// The new record starts `Pending` with a stopped timer and empty control
/// rows. Its total is the archived total, carried over.
pub fn rehydrate(archive: &ArchiveRecord, record_id: String, now: DateTime<Utc>) -> WorkItemRecord {
    let original = &archive.original_data;
    let total = archive.control_data.total_time_minutes;

    WorkItemRecord {
        id: record_id,
        work_item_id: original.work_item_id.clone(),
        item: original.item.clone(),
        owner_user_id: original.owner_user_id.clone(),
        assignee_user_id: original.assignee_user_id.clone(),
        status: WorkItemStatus::Pending,
        timer: Timer::stopped(),
        total_time_minutes: total,
        carried_over_minutes: total,
        assigned_at: now,
        status_history: Vec::new(),
        timer_sessions: Vec::new(),
        manual_entries: Vec::new(),
    }
}

fn invalid(archive: &ArchiveRecord, detail: String) -> CaseLedgerError {
    CaseLedgerError::InvalidSnapshot(format!("archive {}: {detail}", archive.id))
}

//! Archive snapshots and lifecycle state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::work_item::{
    ManualTimeEntry, StatusChange, TimerSession, WorkItem, WorkItemKind, WorkItemRecord,
    WorkItemStatus,
};
use crate::constants::SNAPSHOT_VERSION;
use crate::impl_domain_enum_conversions;

/// Identity and assignment of the archived record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalData {
    pub version: u32,
    pub record_id: String,
    pub work_item_id: String,
    pub item: WorkItem,
    pub owner_user_id: String,
    pub assignee_user_id: String,
    pub assigned_at: DateTime<Utc>,
}

impl OriginalData {
    pub fn capture(record: &WorkItemRecord) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            record_id: record.id.clone(),
            work_item_id: record.work_item_id.clone(),
            item: record.item.clone(),
            owner_user_id: record.owner_user_id.clone(),
            assignee_user_id: record.assignee_user_id.clone(),
            assigned_at: record.assigned_at,
        }
    }
}

/// Status and time accounting of the archived record, frozen at archive time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlData {
    pub version: u32,
    pub status: WorkItemStatus,
    pub total_time_minutes: u32,
    #[serde(default)]
    pub carried_over_minutes: u32,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub timer_sessions: Vec<TimerSession>,
    #[serde(default)]
    pub manual_entries: Vec<ManualTimeEntry>,
}

impl ControlData {
    pub fn capture(record: &WorkItemRecord) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            status: record.status,
            total_time_minutes: record.total_time_minutes,
            carried_over_minutes: record.carried_over_minutes,
            status_history: record.status_history.clone(),
            timer_sessions: record.timer_sessions.clone(),
            manual_entries: record.manual_entries.clone(),
        }
    }
}

/// Who restored an archive, when, and into which live record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restoration {
    pub restored_at: DateTime<Utc>,
    pub restored_by: String,
    pub restored_record_id: String,
}

/// Immutable snapshot of a completed work item
///
/// Restoration only ever sets `restoration`; the snapshot halves are never
/// rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: String,
    pub original_work_item_id: String,
    pub kind: WorkItemKind,
    pub original_data: OriginalData,
    pub control_data: ControlData,
    pub archived_by: String,
    pub archived_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restoration: Option<Restoration>,
}

impl ArchiveRecord {
    pub const fn is_restored(&self) -> bool {
        self.restoration.is_some()
    }

    pub fn owner_user_id(&self) -> &str {
        &self.original_data.owner_user_id
    }

    pub fn restored_at(&self) -> Option<DateTime<Utc>> {
        self.restoration.as_ref().map(|r| r.restored_at)
    }

    pub fn restored_by(&self) -> Option<&str> {
        self.restoration.as_ref().map(|r| r.restored_by.as_str())
    }
}

/// Where an archive id sits in the archive lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Archived,
    Restored,
    Gone,
}

impl_domain_enum_conversions!(LifecycleState {
    Archived => "archived",
    Restored => "restored",
    Gone => "gone",
});

/// Outcome of an orphan reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub live_removed: u64,
    pub archived_removed: u64,
}

impl ReconciliationReport {
    pub const fn total(&self) -> u64 {
        self.live_removed + self.archived_removed
    }
}

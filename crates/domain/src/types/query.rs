//! Listing filters, analytics and export rows
//!
//! [`StoreFilter`] is what gets pushed down to the store: the owner constraint
//! derived from the caller's scope plus the kind. [`LiveQuery`] and
//! [`ArchiveQuery`] are what callers ask for; they are applied on top of the
//! scope-limited result set and can never widen it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::archive::ArchiveRecord;
use super::work_item::{WorkItemKind, WorkItemRecord, WorkItemStatus};

/// Constraint applied by the store itself
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WorkItemKind>,
}

impl StoreFilter {
    pub const fn unrestricted() -> Self {
        Self { owner_user_id: None, kind: None }
    }

    pub fn owned_by(owner_user_id: impl Into<String>) -> Self {
        Self { owner_user_id: Some(owner_user_id.into()), kind: None }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: WorkItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches_live(&self, record: &WorkItemRecord) -> bool {
        self.owner_user_id.as_deref().map_or(true, |owner| record.owner_user_id == owner)
            && self.kind.map_or(true, |kind| record.kind() == kind)
    }

    pub fn matches_archive(&self, archive: &ArchiveRecord) -> bool {
        self.owner_user_id.as_deref().map_or(true, |owner| archive.owner_user_id() == owner)
            && self.kind.map_or(true, |kind| archive.kind == kind)
    }
}

/// Caller-side filters for live listings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveQuery {
    pub owner_user_id: Option<String>,
    pub status: Option<WorkItemStatus>,
    pub text: Option<String>,
    /// Inclusive lower bound on `assigned_at`
    pub assigned_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `assigned_at`
    pub assigned_to: Option<DateTime<Utc>>,
}

/// Caller-side filters for archive listings and exports
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveQuery {
    pub kind: Option<WorkItemKind>,
    pub owner_user_id: Option<String>,
    pub text: Option<String>,
    /// Inclusive lower bound on `archived_at`
    pub archived_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `archived_at`
    pub archived_to: Option<DateTime<Utc>>,
    pub restored: Option<bool>,
}

/// Aggregate view over the archives visible to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArchiveAnalytics {
    pub archived_total: u64,
    pub restored_total: u64,
    pub cases: u64,
    pub todos: u64,
    pub archived_minutes: u64,
}

/// Flat, serializable export line for one archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveExportRow {
    pub archive_id: String,
    pub original_work_item_id: String,
    pub kind: WorkItemKind,
    pub title: String,
    pub case_number: Option<String>,
    pub owner_user_id: String,
    pub final_status: WorkItemStatus,
    pub total_time_minutes: u32,
    pub archived_by: String,
    pub archived_at: DateTime<Utc>,
    pub is_restored: bool,
    pub restored_at: Option<DateTime<Utc>>,
    pub restored_by: Option<String>,
}

impl From<&ArchiveRecord> for ArchiveExportRow {
    fn from(archive: &ArchiveRecord) -> Self {
        let item = &archive.original_data.item;
        Self {
            archive_id: archive.id.clone(),
            original_work_item_id: archive.original_work_item_id.clone(),
            kind: archive.kind,
            title: item.title().to_string(),
            case_number: item.case_number().map(str::to_string),
            owner_user_id: archive.owner_user_id().to_string(),
            final_status: archive.control_data.status,
            total_time_minutes: archive.control_data.total_time_minutes,
            archived_by: archive.archived_by.clone(),
            archived_at: archive.archived_at,
            is_restored: archive.is_restored(),
            restored_at: archive.restored_at(),
            restored_by: archive.restored_by().map(str::to_string),
        }
    }
}

//! Append-only audit trail entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::work_item::WorkItemKind;
use crate::impl_domain_enum_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Archived,
    Restored,
    PermanentlyDeleted,
    OrphanRemoved,
}

impl_domain_enum_conversions!(AuditAction {
    Archived => "archived",
    Restored => "restored",
    PermanentlyDeleted => "permanently_deleted",
    OrphanRemoved => "orphan_removed",
});

/// One lifecycle transition
///
/// `subject_id` is the archive id for archive/restore/delete entries and the
/// removed row's id for orphan removals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub action: AuditAction,
    pub actor_user_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub subject_id: String,
    pub original_work_item_id: String,
    pub kind: WorkItemKind,
}

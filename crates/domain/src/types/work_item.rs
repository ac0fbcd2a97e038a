//! Work items and their live records
//!
//! A work item is either a case or a todo. While it is being worked on it is
//! represented by exactly one [`WorkItemRecord`], which carries the status,
//! the timer and the accumulated minutes together with the control rows that
//! explain how that total came to be.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::access::Resource;
use crate::impl_domain_enum_conversions;

// ============================================================================
// Work Item Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    Case,
    Todo,
}

impl_domain_enum_conversions!(WorkItemKind {
    Case => "case",
    Todo => "todo",
});

impl WorkItemKind {
    /// Capability resource guarding live records of this kind
    pub const fn resource(self) -> Resource {
        match self {
            Self::Case => Resource::Case,
            Self::Todo => Resource::Todo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl_domain_enum_conversions!(TodoPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Kind-specific payload of a work item. Set at creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    Case {
        case_number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        classification: Option<String>,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Todo {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default)]
        priority: TodoPriority,
    },
}

impl WorkItem {
    pub const fn kind(&self) -> WorkItemKind {
        match self {
            Self::Case { .. } => WorkItemKind::Case,
            Self::Todo { .. } => WorkItemKind::Todo,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Case { title, .. } | Self::Todo { title, .. } => title,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Case { description, .. } | Self::Todo { description, .. } => {
                description.as_deref()
            }
        }
    }

    pub fn case_number(&self) -> Option<&str> {
        match self {
            Self::Case { case_number, .. } => Some(case_number),
            Self::Todo { .. } => None,
        }
    }

    /// Case-insensitive substring match against title, description and case
    /// number. `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        let hit = |field: &str| field.to_lowercase().contains(needle);

        hit(self.title())
            || self.description().is_some_and(hit)
            || self.case_number().is_some_and(hit)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Status of a live record
///
/// Transitions between the four states are unrestricted. Only `Done` makes a
/// record eligible for archival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    #[default]
    Pending,
    InProgress,
    Escalated,
    Done,
}

impl_domain_enum_conversions!(WorkItemStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Escalated => "escalated",
    Done => "done",
});

impl WorkItemStatus {
    pub const fn is_archivable(self) -> bool {
        matches!(self, Self::Done)
    }
}

// ============================================================================
// Time Accounting
// ============================================================================

/// Single-slot timer state
///
/// `running_since` is present exactly when `is_running` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timer {
    pub is_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_since: Option<DateTime<Utc>>,
}

impl Timer {
    pub const fn stopped() -> Self {
        Self { is_running: false, running_since: None }
    }

    pub const fn running(since: DateTime<Utc>) -> Self {
        Self { is_running: true, running_since: Some(since) }
    }
}

/// One committed running interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub minutes: u32,
    /// `true` when ended by stop, `false` when paused
    pub closed: bool,
}

/// Time declared by hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTimeEntry {
    pub id: String,
    pub work_item_record_id: String,
    pub duration_minutes: u32,
    pub date: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: WorkItemStatus,
    pub to: WorkItemStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

// ============================================================================
// Live Record
// ============================================================================

/// Live representation of a work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemRecord {
    pub id: String,
    pub work_item_id: String,
    pub item: WorkItem,
    pub owner_user_id: String,
    pub assignee_user_id: String,
    pub status: WorkItemStatus,
    pub timer: Timer,
    pub total_time_minutes: u32,
    /// Minutes brought over from an earlier archive when this record was
    /// created by restoration
    #[serde(default)]
    pub carried_over_minutes: u32,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub timer_sessions: Vec<TimerSession>,
    #[serde(default)]
    pub manual_entries: Vec<ManualTimeEntry>,
}

impl WorkItemRecord {
    pub const fn kind(&self) -> WorkItemKind {
        self.item.kind()
    }

    /// Minutes explained by the control rows plus any carried-over total
    ///
    /// Equals `total_time_minutes` unless a saturating add clamped the total.
    pub fn recorded_minutes(&self) -> u64 {
        let sessions: u64 = self.timer_sessions.iter().map(|s| u64::from(s.minutes)).sum();
        let manual: u64 = self.manual_entries.iter().map(|e| u64::from(e.duration_minutes)).sum();
        u64::from(self.carried_over_minutes) + sessions + manual
    }
}

/// Request to put a work item into the live set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub work_item_id: String,
    pub item: WorkItem,
    pub owner_user_id: String,
    /// Defaults to the owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_user_id: Option<String>,
}

/// Request to log time by hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntryRequest {
    /// Must be positive. Signed so that bad input is reported, not wrapped.
    pub duration_minutes: i64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn case() -> WorkItem {
        WorkItem::Case {
            case_number: "CL-2024-017".into(),
            classification: Some("contract".into()),
            title: "Vendor Dispute".into(),
            description: Some("Late delivery penalties".into()),
        }
    }

    #[test]
    fn work_item_serializes_with_kind_tag() {
        let json = serde_json::to_value(case()).unwrap();
        assert_eq!(json["kind"], "case");
        assert_eq!(json["case_number"], "CL-2024-017");

        let todo: WorkItem =
            serde_json::from_str(r#"{"kind":"todo","title":"File memo"}"#).unwrap();
        assert_eq!(todo.kind(), WorkItemKind::Todo);
        assert!(matches!(todo, WorkItem::Todo { priority: TodoPriority::Medium, .. }));
    }

    #[test]
    fn text_match_is_case_insensitive_over_all_fields() {
        let item = case();
        assert!(item.matches_text("vendor"));
        assert!(item.matches_text("penalties"));
        assert!(item.matches_text("cl-2024"));
        assert!(!item.matches_text("invoice"));
    }

    #[test]
    fn status_parsing_and_eligibility() {
        assert_eq!("IN_PROGRESS".parse::<WorkItemStatus>().unwrap(), WorkItemStatus::InProgress);
        assert!(WorkItemStatus::Done.is_archivable());
        assert!(!WorkItemStatus::Escalated.is_archivable());
        assert!("closed".parse::<WorkItemStatus>().is_err());
    }

    #[test]
    fn recorded_minutes_sums_control_rows() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let record = WorkItemRecord {
            id: "r1".into(),
            work_item_id: "w1".into(),
            item: case(),
            owner_user_id: "u1".into(),
            assignee_user_id: "u1".into(),
            status: WorkItemStatus::Pending,
            timer: Timer::stopped(),
            total_time_minutes: 45,
            carried_over_minutes: 10,
            assigned_at: at,
            status_history: vec![],
            timer_sessions: vec![TimerSession { started_at: at, ended_at: at, minutes: 5, closed: true }],
            manual_entries: vec![ManualTimeEntry {
                id: "m1".into(),
                work_item_record_id: "r1".into(),
                duration_minutes: 30,
                date: at.date_naive(),
                created_by: "u1".into(),
                created_at: at,
                note: None,
            }],
        };

        assert_eq!(record.recorded_minutes(), 45);
        assert_eq!(record.kind(), WorkItemKind::Case);
    }
}

//! Domain types and models

pub mod access;
pub mod archive;
pub mod audit;
pub mod query;
pub mod work_item;

pub use access::{Action, Actor, Capability, Resource, Scope};
pub use archive::{
    ArchiveRecord, ControlData, LifecycleState, OriginalData, ReconciliationReport, Restoration,
};
pub use audit::{AuditAction, AuditEntry};
pub use query::{ArchiveAnalytics, ArchiveExportRow, ArchiveQuery, LiveQuery, StoreFilter};
pub use work_item::{
    ManualEntryRequest, ManualTimeEntry, NewAssignment, StatusChange, Timer, TimerSession,
    TodoPriority, WorkItem, WorkItemKind, WorkItemRecord, WorkItemStatus,
};

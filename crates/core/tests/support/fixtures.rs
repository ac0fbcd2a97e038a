//! Actors, work items and a fully wired harness

use std::sync::Arc;

use caseledger_common::time::{Clock, MockClock};
use caseledger_core::{ArchiveEngine, QueryGateway, WorkItemService};
use caseledger_domain::{
    Actor, ArchivePolicyConfig, ManualEntryRequest, NewAssignment, TodoPriority, WorkItem,
    WorkItemRecord, WorkItemStatus,
};
use chrono::{DateTime, NaiveDate, Utc};

use super::repositories::{InMemoryDirectory, InMemoryWorkItemStore};

// ============================================================================
// Actors
// ============================================================================

pub fn actor(user_id: &str, grants: &[&str]) -> Actor {
    Actor::with_grants(user_id, grants.iter().copied()).expect("fixture grants should parse")
}

/// Regular user: full control over their own items and archives
pub fn worker(user_id: &str) -> Actor {
    actor(
        user_id,
        &[
            "case.view_own",
            "case.create_own",
            "case.update_own",
            "case.track_time_own",
            "todo.view_own",
            "todo.create_own",
            "todo.update_own",
            "todo.track_time_own",
            "archive.view_own",
            "archive.create_own",
            "archive.restore_own",
            "archive.delete_own",
            "archive.analytics_own",
            "archive.export_own",
        ],
    )
}

/// Administrator: every action at `all` scope, including maintenance
pub fn admin(user_id: &str) -> Actor {
    let mut grants = Vec::new();
    for resource in ["case", "todo"] {
        for action in ["view", "create", "update", "track_time"] {
            grants.push(format!("{resource}.{action}_all"));
        }
    }
    for action in ["view", "create", "restore", "delete", "analytics", "export"] {
        grants.push(format!("archive.{action}_all"));
    }
    grants.push("system.maintain_all".to_string());

    Actor::with_grants(user_id, grants).expect("admin grants should parse")
}

// ============================================================================
// Work Items
// ============================================================================

pub fn case_item(case_number: &str, title: &str) -> WorkItem {
    WorkItem::Case {
        case_number: case_number.to_string(),
        classification: Some("commercial".to_string()),
        title: title.to_string(),
        description: Some(format!("Matter {case_number}")),
    }
}

pub fn todo_item(title: &str) -> WorkItem {
    WorkItem::Todo { title: title.to_string(), description: None, priority: TodoPriority::High }
}

pub fn manual(minutes: i64) -> ManualEntryRequest {
    ManualEntryRequest {
        duration_minutes: minutes,
        date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
        note: None,
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Services wired to in-memory ports and a shared mock clock
pub struct Harness {
    pub store: Arc<InMemoryWorkItemStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub clock: MockClock,
    pub work_items: WorkItemService,
    pub archives: ArchiveEngine,
    pub queries: QueryGateway,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(ArchivePolicyConfig::default())
    }

    pub fn with_policy(policy: ArchivePolicyConfig) -> Self {
        let store = Arc::new(InMemoryWorkItemStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let clock = MockClock::new();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

        let work_items = WorkItemService::new(store.clone(), Arc::clone(&shared_clock));
        let archives = ArchiveEngine::new(store.clone(), directory.clone(), shared_clock)
            .with_policy(policy);
        let queries = QueryGateway::new(store.clone());

        Self { store, directory, clock, work_items, archives, queries }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Assign a work item owned by `owner` and register it in the directory
    pub fn assign(
        &self,
        as_actor: &Actor,
        work_item_id: &str,
        owner: &str,
        item: WorkItem,
    ) -> WorkItemRecord {
        self.directory.add_user(owner);
        self.directory.add_work_item(item.kind(), work_item_id);

        self.work_items
            .assign(
                as_actor,
                NewAssignment {
                    work_item_id: work_item_id.to_string(),
                    item,
                    owner_user_id: owner.to_string(),
                    assignee_user_id: None,
                },
            )
            .expect("assignment should succeed")
    }

    /// A case owned by `owner`, with `minutes` of manual time, marked `Done`
    pub fn done_case(&self, owner: &Actor, work_item_id: &str, minutes: i64) -> WorkItemRecord {
        let item = case_item(work_item_id, "Closing memo");
        let record = self.assign(owner, work_item_id, &owner.user_id, item);
        if minutes > 0 {
            self.work_items
                .add_manual_entry(owner, &record.id, manual(minutes))
                .expect("manual entry should succeed");
        }
        self.work_items
            .change_status(owner, &record.id, WorkItemStatus::Done)
            .expect("status change should succeed")
    }

    /// Archive a freshly created `Done` case and return the archive id
    pub fn archived_case(&self, owner: &Actor, work_item_id: &str, minutes: i64) -> String {
        let record = self.done_case(owner, work_item_id, minutes);
        self.archives
            .archive(owner, &record.id, Some("complete"))
            .expect("archive should succeed")
    }
}

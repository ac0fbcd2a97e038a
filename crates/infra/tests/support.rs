#![allow(dead_code)]

use std::sync::Arc;

use caseledger_common::time::{Clock, MockClock};
use caseledger_core::{ArchiveEngine, QueryGateway, WorkItemService};
use caseledger_domain::{
    Actor, ArchivePolicyConfig, ManualEntryRequest, NewAssignment, WorkItem, WorkItemRecord,
};
use caseledger_infra::database::{DbManager, SqliteEntityDirectory, SqliteWorkItemStore};
use chrono::NaiveDate;
use tempfile::TempDir;

/// Temporary database with every service wired to it. The directory is kept
/// alive for the duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    pub store: Arc<SqliteWorkItemStore>,
    pub directory: Arc<SqliteEntityDirectory>,
    pub clock: MockClock,
    pub work_items: WorkItemService,
    pub archives: ArchiveEngine,
    pub queries: QueryGateway,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new migrated database with default policy.
    pub fn new() -> Self {
        Self::with_policy(ArchivePolicyConfig::default())
    }

    pub fn with_policy(policy: ArchivePolicyConfig) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("caseledger-test.db");

        let manager = Arc::new(DbManager::new(&db_path, 4).expect("db manager should be created"));
        manager.run_migrations().expect("schema migrations should apply");

        let store = Arc::new(SqliteWorkItemStore::new(Arc::clone(&manager)));
        let directory = Arc::new(SqliteEntityDirectory::new(Arc::clone(&manager)));
        let clock = MockClock::new();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

        let work_items = WorkItemService::new(store.clone(), Arc::clone(&shared_clock));
        let archives =
            ArchiveEngine::new(store.clone(), directory.clone(), shared_clock).with_policy(policy);
        let queries = QueryGateway::new(store.clone());

        Self { manager, store, directory, clock, work_items, archives, queries, _temp_dir: temp_dir }
    }

    /// Register owner and work item in the directory, then assign.
    pub fn assign(&self, actor: &Actor, work_item_id: &str, item: WorkItem) -> WorkItemRecord {
        self.directory.upsert_user(&actor.user_id).expect("user registered");
        self.directory.upsert_work_item(item.kind(), work_item_id).expect("work item registered");

        self.work_items
            .assign(
                actor,
                NewAssignment {
                    work_item_id: work_item_id.to_string(),
                    item,
                    owner_user_id: actor.user_id.clone(),
                    assignee_user_id: None,
                },
            )
            .expect("assignment should succeed")
    }

    /// Count rows in `table`.
    pub fn count(&self, table: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection");
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), &[], |row| row.get(0))
            .expect("count query")
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Every own-scope grant a regular user holds.
pub fn worker(user_id: &str) -> Actor {
    let grants = [
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
    ];
    Actor::with_grants(user_id, grants).expect("grants should parse")
}

pub fn admin(user_id: &str) -> Actor {
    let grants = [
        "case.view_all",
        "todo.view_all",
        "archive.view_all",
        "archive.restore_all",
        "archive.delete_all",
        "archive.analytics_all",
        "system.maintain_all",
    ];
    Actor::with_grants(user_id, grants).expect("grants should parse")
}

pub fn case(case_number: &str) -> WorkItem {
    WorkItem::Case {
        case_number: case_number.to_string(),
        classification: None,
        title: format!("Matter {case_number}"),
        description: None,
    }
}

pub fn manual(minutes: i64) -> ManualEntryRequest {
    ManualEntryRequest {
        duration_minutes: minutes,
        date: NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
        note: Some("research".to_string()),
    }
}

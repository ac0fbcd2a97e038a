//! End-to-end coverage of the services running on the SQLite store.
//!
//! Each test operates on an isolated, migrated database file so that
//! serialization of control rows and snapshots, the transaction boundaries
//! and the schema constraints are all exercised for real.

mod support;

use std::sync::Arc;
use std::thread;

use caseledger_common::time::Clock;
use caseledger_core::store::{atomically, WorkItemStore};
use caseledger_domain::{
    ArchiveQuery, AuditAction, CaseLedgerError, LifecycleState, LiveQuery, WorkItemKind,
    WorkItemStatus,
};
use chrono::Duration;
use support::{admin, case, manual, worker, TestDatabase};

#[test]
fn live_record_round_trips_with_control_rows() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let record = db.assign(&alice, "case-1", case("C-1"));

    db.work_items.start_timer(&alice, &record.id).unwrap();
    db.clock.advance(Duration::minutes(42));
    db.work_items.pause_timer(&alice, &record.id).unwrap();
    db.work_items.add_manual_entry(&alice, &record.id, manual(30)).unwrap();
    db.work_items.change_status(&alice, &record.id, WorkItemStatus::InProgress).unwrap();
    db.work_items.start_timer(&alice, &record.id).unwrap();

    let loaded = db.work_items.get(&alice, &record.id).unwrap();
    assert_eq!(loaded.total_time_minutes, 72);
    assert_eq!(loaded.recorded_minutes(), 72);
    assert_eq!(loaded.timer_sessions.len(), 1);
    assert_eq!(loaded.manual_entries[0].note.as_deref(), Some("research"));
    assert_eq!(loaded.manual_entries[0].work_item_record_id, record.id);
    assert_eq!(loaded.status_history.len(), 1);
    assert!(loaded.timer.is_running);
    assert_eq!(loaded.timer.running_since, Some(db.clock.now()));
    assert_eq!(loaded.item, record.item);
}

#[test]
fn archive_restore_delete_flow() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let record = db.assign(&alice, "case-1", case("C-1"));
    db.work_items.add_manual_entry(&alice, &record.id, manual(90)).unwrap();
    db.work_items.change_status(&alice, &record.id, WorkItemStatus::Done).unwrap();

    let archive_id = db.archives.archive(&alice, &record.id, Some("closed")).unwrap();
    assert_eq!(db.count("work_item_records"), 0);
    assert_eq!(db.count("manual_time_entries"), 0, "control rows leave with the record");
    assert_eq!(db.count("archive_records"), 1);

    let archived = db.queries.list_archived(&alice, &ArchiveQuery::default()).unwrap();
    assert_eq!(archived[0].control_data.total_time_minutes, 90);
    assert_eq!(archived[0].control_data.manual_entries.len(), 1);
    assert_eq!(archived[0].archive_reason.as_deref(), Some("closed"));

    db.clock.advance(Duration::days(3));
    let restored = db.archives.restore(&alice, &archive_id, None).unwrap();
    assert_eq!(restored.status, WorkItemStatus::Pending);
    assert_eq!(restored.total_time_minutes, 90);
    assert_eq!(restored.carried_over_minutes, 90);
    assert_eq!(db.archives.lifecycle(&alice, &archive_id).unwrap(), LifecycleState::Restored);

    let err = db.archives.restore(&alice, &archive_id, None).unwrap_err();
    assert_eq!(err.label(), "already_restored");

    db.archives.permanently_delete(&alice, &archive_id, Some("retention")).unwrap();
    assert_eq!(db.count("archive_records"), 0);
    assert_eq!(db.archives.lifecycle(&alice, &archive_id).unwrap(), LifecycleState::Gone);
    assert_eq!(
        db.archives.permanently_delete(&alice, &archive_id, None).unwrap_err(),
        CaseLedgerError::AlreadyDeleted(archive_id.clone())
    );

    let trail = db.archives.audit_trail(&admin("root"), "case-1").unwrap();
    let actions: Vec<_> = trail.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Archived, AuditAction::Restored, AuditAction::PermanentlyDeleted]
    );
    assert!(db.work_items.get(&alice, &restored.id).is_ok(), "restored record stays live");
}

#[test]
fn failed_operation_leaves_no_partial_writes() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let record = db.assign(&alice, "case-1", case("C-1"));

    let outcome: Result<(), CaseLedgerError> = atomically(db.store.as_ref(), |tx| {
        let mut live = tx.get_live(&record.id)?.expect("record exists");
        live.total_time_minutes = 999;
        tx.put_live(&live)?;
        tx.delete_live(&record.id)?;
        Err(CaseLedgerError::Internal("abort".into()))
    });
    assert!(outcome.is_err());

    let loaded = db.work_items.get(&alice, &record.id).unwrap();
    assert_eq!(loaded.total_time_minutes, 0);
    assert_eq!(db.manager.pool().metrics().snapshot().transactions_rolled_back, 1);
}

#[test]
fn duplicate_work_item_is_rejected() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    db.assign(&alice, "case-1", case("C-1"));

    let err = db
        .work_items
        .assign(
            &alice,
            caseledger_domain::NewAssignment {
                work_item_id: "case-1".into(),
                item: case("C-1"),
                owner_user_id: "alice".into(),
                assignee_user_id: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.label(), "conflict");
    assert_eq!(db.count("work_item_records"), 1);
}

#[test]
fn concurrent_writers_on_distinct_records() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let records: Vec<_> =
        (0..4).map(|i| db.assign(&alice, &format!("case-{i}"), case(&format!("C-{i}")))).collect();

    let work_items = Arc::new(db.work_items);
    let handles: Vec<_> = records
        .iter()
        .map(|record| {
            let work_items = Arc::clone(&work_items);
            let alice = alice.clone();
            let record_id = record.id.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    work_items.add_manual_entry(&alice, &record_id, manual(3)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    for record in &records {
        let loaded = work_items.get(&alice, &record.id).unwrap();
        assert_eq!(loaded.total_time_minutes, 15);
        assert_eq!(loaded.manual_entries.len(), 5);
    }
}

#[test]
fn concurrent_writers_on_one_record_are_serialized() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let record = db.assign(&alice, "case-1", case("C-1"));

    let work_items = Arc::new(db.work_items);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let work_items = Arc::clone(&work_items);
            let alice = alice.clone();
            let record_id = record.id.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    work_items.add_manual_entry(&alice, &record_id, manual(1)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let loaded = work_items.get(&alice, &record.id).unwrap();
    assert_eq!(loaded.total_time_minutes, 20, "no lost updates");
    assert_eq!(loaded.manual_entries.len(), 20);
}

#[test]
fn listings_are_scoped_by_owner() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let bob = worker("bob");

    for (actor, id) in [(&alice, "case-a"), (&bob, "case-b")] {
        let record = db.assign(actor, id, case(id));
        db.work_items.change_status(actor, &record.id, WorkItemStatus::Done).unwrap();
        db.archives.archive(actor, &record.id, None).unwrap();
    }
    db.assign(&alice, "case-live", case("C-live"));

    let query = ArchiveQuery { owner_user_id: Some("bob".into()), ..ArchiveQuery::default() };
    assert!(db.queries.list_archived(&alice, &query).unwrap().is_empty());
    assert_eq!(db.queries.list_archived(&admin("root"), &query).unwrap().len(), 1);

    let live = db.queries.list_live(&bob, WorkItemKind::Case, &LiveQuery::default()).unwrap();
    assert!(live.is_empty());
    assert_eq!(db.queries.analytics(&admin("root")).unwrap().archived_total, 2);
}

#[test]
fn reconciliation_uses_the_directory_tables() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let bob = worker("bob");
    db.assign(&alice, "case-a", case("C-a"));
    let record = db.assign(&bob, "case-b", case("C-b"));
    db.work_items.change_status(&bob, &record.id, WorkItemStatus::Done).unwrap();
    db.archives.archive(&bob, &record.id, None).unwrap();

    db.directory.remove_user("bob").unwrap();
    let report = db.archives.reconcile_orphans(&admin("root")).unwrap();
    assert_eq!(report.live_removed, 0);
    assert_eq!(report.archived_removed, 1);
    assert_eq!(db.count("archive_records"), 0);
    assert_eq!(db.count("work_item_records"), 1);

    assert_eq!(db.archives.reconcile_orphans(&admin("root")).unwrap().total(), 0);
}

#[test]
fn corrupt_snapshot_fails_restore_cleanly() {
    let db = TestDatabase::new();
    let alice = worker("alice");
    let record = db.assign(&alice, "case-1", case("C-1"));
    db.work_items.change_status(&alice, &record.id, WorkItemStatus::Done).unwrap();
    let archive_id = db.archives.archive(&alice, &record.id, None).unwrap();

    let conn = db.manager.get_connection().unwrap();
    conn.execute(
        "UPDATE archive_records SET control_data = '{\"version\": 1' WHERE id = ?1",
        &[&archive_id],
    )
    .unwrap();
    drop(conn);

    let err = db.archives.restore(&alice, &archive_id, None).unwrap_err();
    assert_eq!(err.label(), "invalid_snapshot");
    assert_eq!(db.count("work_item_records"), 0);
    assert_eq!(db.count("audit_log"), 1, "only the archive entry");
}

#[test]
fn store_begin_fails_cleanly_on_missing_schema() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let manager = Arc::new(
        caseledger_infra::DbManager::new(temp_dir.path().join("empty.db"), 1).unwrap(),
    );
    let store = caseledger_infra::SqliteWorkItemStore::new(manager);

    let mut tx = store.begin().unwrap();
    let err = tx.get_live("anything").unwrap_err();
    assert_eq!(err.label(), "store_failure");
    assert!(tx.delete_live("anything").is_err());
}

//! Integration tests for storage module
//!
//! These tests verify end-to-end storage workflows including:
//! - Connection pooling with pragmas applied on open
//! - Immediate transactions serializing concurrent writers
//! - Readers on other connections while a write transaction is open
//! - Health checks and metrics

#![cfg(feature = "platform")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use caseledger_common::storage::{SqlitePool, SqlitePoolConfig, StorageError};
use tempfile::TempDir;

// ============================================================================
// Test Helper Functions
// ============================================================================

fn create_pool(dir: &TempDir, max_size: u32) -> SqlitePool {
    let config = SqlitePoolConfig::default().with_max_size(max_size);
    let pool = SqlitePool::new(&dir.path().join("storage.db"), config).expect("pool created");

    pool.get_connection()
        .expect("connection")
        .execute("CREATE TABLE counters (name TEXT PRIMARY KEY, value INTEGER NOT NULL)", &[])
        .expect("table created");
    pool
}

fn counter(pool: &SqlitePool, name: &str) -> Option<i64> {
    pool.get_connection()
        .expect("connection")
        .query_optional("SELECT value FROM counters WHERE name = ?1", &[&name], |row| row.get(0))
        .expect("query")
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn test_immediate_transactions_serialize_read_modify_write() {
    let dir = TempDir::new().unwrap();
    let pool = Arc::new(create_pool(&dir, 4));
    pool.get_connection()
        .unwrap()
        .execute("INSERT INTO counters (name, value) VALUES ('hits', 0)", &[])
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..25 {
                    let tx = pool.get_connection().unwrap().begin_immediate().unwrap();
                    let value: i64 = tx
                        .query_row("SELECT value FROM counters WHERE name = 'hits'", &[], |row| {
                            row.get(0)
                        })
                        .unwrap();
                    tx.execute("UPDATE counters SET value = ?1 WHERE name = 'hits'", &[&(value + 1)])
                        .unwrap();
                    tx.commit().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    assert_eq!(counter(&pool, "hits"), Some(100), "no increments lost");
    assert_eq!(pool.metrics().snapshot().transactions_committed, 100);
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let dir = TempDir::new().unwrap();
    let pool = create_pool(&dir, 2);

    {
        let tx = pool.get_connection().unwrap().begin_immediate().unwrap();
        tx.execute("INSERT INTO counters (name, value) VALUES ('draft', 1)", &[]).unwrap();
    }

    assert_eq!(counter(&pool, "draft"), None);
    assert_eq!(pool.metrics().snapshot().transactions_rolled_back, 1);
}

#[test]
fn test_reader_sees_committed_state_during_write() {
    let dir = TempDir::new().unwrap();
    let pool = create_pool(&dir, 2);
    pool.get_connection()
        .unwrap()
        .execute("INSERT INTO counters (name, value) VALUES ('seen', 1)", &[])
        .unwrap();

    let tx = pool.get_connection().unwrap().begin_immediate().unwrap();
    tx.execute("UPDATE counters SET value = 2 WHERE name = 'seen'", &[]).unwrap();

    assert_eq!(counter(&pool, "seen"), Some(1), "WAL readers don't block on the writer");
    tx.commit().unwrap();
    assert_eq!(counter(&pool, "seen"), Some(2));
}

#[test]
fn test_constraint_violation_surfaces_sqlite_error() {
    let dir = TempDir::new().unwrap();
    let pool = create_pool(&dir, 1);
    let conn = pool.get_connection().unwrap();
    conn.execute("INSERT INTO counters (name, value) VALUES ('dup', 1)", &[]).unwrap();

    let err = conn.execute("INSERT INTO counters (name, value) VALUES ('dup', 2)", &[]).unwrap_err();
    let StorageError::Rusqlite(cause) = err else {
        panic!("expected a sqlite error, got {err:?}");
    };
    assert_eq!(cause.sqlite_error_code(), Some(rusqlite::ErrorCode::ConstraintViolation));
}

// ============================================================================
// Pool behavior
// ============================================================================

#[test]
fn test_exhausted_pool_times_out() {
    let dir = TempDir::new().unwrap();
    let config = SqlitePoolConfig {
        connection_timeout: Duration::from_millis(200),
        ..SqlitePoolConfig::default()
    }
    .with_max_size(1);
    let pool = SqlitePool::new(&dir.path().join("exhausted.db"), config).unwrap();

    let _held = pool.get_connection().unwrap();
    let Err(err) = pool.get_connection() else {
        panic!("second checkout should wait out the timeout");
    };

    assert!(matches!(err, StorageError::Timeout(_)), "got {err:?}");
    assert_eq!(pool.metrics().snapshot().connections_timeout, 1);
}

#[test]
fn test_health_check_reports_pool_shape() {
    let dir = TempDir::new().unwrap();
    let pool = create_pool(&dir, 3);

    let health = pool.health_check();
    assert!(health.healthy);
    assert_eq!(health.max_connections, 3);
    assert!(health.message.is_none());
}

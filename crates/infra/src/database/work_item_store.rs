//! SQLite-backed implementation of the `WorkItemStore` port.
//!
//! Every core operation gets its own pooled connection running a
//! `BEGIN IMMEDIATE` transaction, so concurrent writers are serialized by
//! SQLite itself and a transaction dropped without commit rolls back.
//!
//! Live records are stored relationally with one table per kind of control
//! row. Archive snapshots are stored as versioned JSON documents next to the
//! columns listings filter on.

use std::str::FromStr;
use std::sync::Arc;

use caseledger_common::storage::ImmediateTransaction;
use caseledger_core::store::{StoreTransaction, WorkItemStore};
use caseledger_domain::constants::MANUAL_ENTRY_DATE_FORMAT;
use caseledger_domain::{
    ArchiveRecord, AuditAction, AuditEntry, CaseLedgerError, ManualTimeEntry, Restoration, Result,
    StatusChange, StoreFilter, Timer, TimerSession, WorkItem, WorkItemKind, WorkItemRecord,
    WorkItemStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};
use tracing::{debug, instrument};

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed store for live records, archives and the audit trail.
pub struct SqliteWorkItemStore {
    db: Arc<DbManager>,
}

impl SqliteWorkItemStore {
    /// Create a store backed by the shared pool.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

impl WorkItemStore for SqliteWorkItemStore {
    #[instrument(skip(self))]
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        let conn = self.db.get_connection()?;
        let tx = conn.begin_immediate().map_err(InfraError::from)?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// One `BEGIN IMMEDIATE` transaction on a pooled connection.
pub struct SqliteTransaction {
    tx: ImmediateTransaction,
}

/* -------------------------------------------------------------------------- */
/* SQL */
/* -------------------------------------------------------------------------- */

const LIVE_COLUMNS: &str = "id, work_item_id, item_json, owner_user_id, assignee_user_id, status, \
     timer_running, running_since, total_time_minutes, carried_over_minutes, assigned_at";

const UPSERT_LIVE_SQL: &str = "INSERT INTO work_item_records (
        id, work_item_id, kind, item_json, owner_user_id, assignee_user_id, status,
        timer_running, running_since, total_time_minutes, carried_over_minutes, assigned_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    ON CONFLICT(id) DO UPDATE SET
        assignee_user_id = excluded.assignee_user_id,
        status = excluded.status,
        timer_running = excluded.timer_running,
        running_since = excluded.running_since,
        total_time_minutes = excluded.total_time_minutes,
        carried_over_minutes = excluded.carried_over_minutes";

const INSERT_STATUS_CHANGE_SQL: &str = "INSERT INTO status_changes
    (record_id, seq, from_status, to_status, changed_by, changed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_TIMER_SESSION_SQL: &str = "INSERT INTO timer_sessions
    (record_id, seq, started_at, ended_at, minutes, closed)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_MANUAL_ENTRY_SQL: &str = "INSERT INTO manual_time_entries
    (id, record_id, seq, duration_minutes, entry_date, created_by, created_at, note)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const ARCHIVE_COLUMNS: &str = "id, original_work_item_id, kind, original_data, control_data, \
     archived_by, archived_at, archive_reason, restored_at, restored_by, restored_record_id";

const UPSERT_ARCHIVE_SQL: &str = "INSERT INTO archive_records (
        id, original_work_item_id, kind, owner_user_id, original_data, control_data,
        archived_by, archived_at, archive_reason, restored_at, restored_by, restored_record_id
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    ON CONFLICT(id) DO UPDATE SET
        restored_at = excluded.restored_at,
        restored_by = excluded.restored_by,
        restored_record_id = excluded.restored_record_id";

const AUDIT_COLUMNS: &str =
    "id, action, actor_user_id, occurred_at, reason, subject_id, original_work_item_id, kind";

/* -------------------------------------------------------------------------- */
/* Port implementation */
/* -------------------------------------------------------------------------- */

impl StoreTransaction for SqliteTransaction {
    fn get_live(&self, record_id: &str) -> Result<Option<WorkItemRecord>> {
        let sql = format!("SELECT {LIVE_COLUMNS} FROM work_item_records WHERE id = ?1");
        let row = self.tx.query_optional(&sql, params![record_id], LiveRow::from_row);
        match row.map_err(InfraError::from)? {
            Some(row) => self.hydrate_live(row).map(Some),
            None => Ok(None),
        }
    }

    fn find_live_by_work_item(&self, work_item_id: &str) -> Result<Option<WorkItemRecord>> {
        let sql = format!("SELECT {LIVE_COLUMNS} FROM work_item_records WHERE work_item_id = ?1");
        let row = self.tx.query_optional(&sql, params![work_item_id], LiveRow::from_row);
        match row.map_err(InfraError::from)? {
            Some(row) => self.hydrate_live(row).map(Some),
            None => Ok(None),
        }
    }

    fn put_live(&mut self, record: &WorkItemRecord) -> Result<()> {
        let item_json = serde_json::to_string(&record.item).map_err(InfraError::from)?;

        self.tx
            .execute(
                UPSERT_LIVE_SQL,
                params![
                    record.id,
                    record.work_item_id,
                    record.kind().as_str(),
                    item_json,
                    record.owner_user_id,
                    record.assignee_user_id,
                    record.status.as_str(),
                    record.timer.is_running,
                    record.timer.running_since.map(to_millis),
                    record.total_time_minutes,
                    record.carried_over_minutes,
                    to_millis(record.assigned_at),
                ],
            )
            .map_err(InfraError::from)?;

        self.delete_control_rows(&record.id)?;
        self.insert_control_rows(record)?;

        debug!(record_id = %record.id, "live record written");
        Ok(())
    }

    fn delete_live(&mut self, record_id: &str) -> Result<bool> {
        self.delete_control_rows(record_id)?;
        let deleted = self
            .tx
            .execute("DELETE FROM work_item_records WHERE id = ?1", params![record_id])
            .map_err(InfraError::from)?;
        Ok(deleted > 0)
    }

    fn list_live(&self, filter: &StoreFilter) -> Result<Vec<WorkItemRecord>> {
        let sql = format!(
            "SELECT {LIVE_COLUMNS} FROM work_item_records
             WHERE (?1 IS NULL OR owner_user_id = ?1) AND (?2 IS NULL OR kind = ?2)
             ORDER BY assigned_at DESC, id"
        );
        let rows = {
            let mut stmt = self.tx.prepare(&sql).map_err(InfraError::from)?;
            stmt.query_map(
                params![filter.owner_user_id, filter.kind.as_ref().map(WorkItemKind::as_str)],
                LiveRow::from_row,
            )
            .map_err(InfraError::from)?
        };

        rows.into_iter().map(|row| self.hydrate_live(row)).collect()
    }

    fn get_archive(&self, archive_id: &str) -> Result<Option<ArchiveRecord>> {
        let sql = format!("SELECT {ARCHIVE_COLUMNS} FROM archive_records WHERE id = ?1");
        self.tx
            .query_optional(&sql, params![archive_id], ArchiveRow::from_row)
            .map_err(InfraError::from)?
            .map(ArchiveRow::into_archive)
            .transpose()
    }

    fn find_active_archive(&self, work_item_id: &str) -> Result<Option<ArchiveRecord>> {
        let sql = format!(
            "SELECT {ARCHIVE_COLUMNS} FROM archive_records
             WHERE original_work_item_id = ?1 AND restored_at IS NULL"
        );
        self.tx
            .query_optional(&sql, params![work_item_id], ArchiveRow::from_row)
            .map_err(InfraError::from)?
            .map(ArchiveRow::into_archive)
            .transpose()
    }

    fn put_archive(&mut self, archive: &ArchiveRecord) -> Result<()> {
        let original_data =
            serde_json::to_string(&archive.original_data).map_err(InfraError::from)?;
        let control_data = serde_json::to_string(&archive.control_data).map_err(InfraError::from)?;
        let restoration = archive.restoration.as_ref();

        self.tx
            .execute(
                UPSERT_ARCHIVE_SQL,
                params![
                    archive.id,
                    archive.original_work_item_id,
                    archive.kind.as_str(),
                    archive.owner_user_id(),
                    original_data,
                    control_data,
                    archive.archived_by,
                    to_millis(archive.archived_at),
                    archive.archive_reason,
                    restoration.map(|r| to_millis(r.restored_at)),
                    restoration.map(|r| r.restored_by.as_str()),
                    restoration.map(|r| r.restored_record_id.as_str()),
                ],
            )
            .map_err(InfraError::from)?;

        debug!(archive_id = %archive.id, restored = archive.is_restored(), "archive written");
        Ok(())
    }

    fn delete_archive(&mut self, archive_id: &str) -> Result<bool> {
        let deleted = self
            .tx
            .execute("DELETE FROM archive_records WHERE id = ?1", params![archive_id])
            .map_err(InfraError::from)?;
        Ok(deleted > 0)
    }

    fn list_archive(&self, filter: &StoreFilter) -> Result<Vec<ArchiveRecord>> {
        let sql = format!(
            "SELECT {ARCHIVE_COLUMNS} FROM archive_records
             WHERE (?1 IS NULL OR owner_user_id = ?1) AND (?2 IS NULL OR kind = ?2)
             ORDER BY archived_at DESC, id"
        );
        let mut stmt = self.tx.prepare(&sql).map_err(InfraError::from)?;
        let rows = stmt
            .query_map(
                params![filter.owner_user_id, filter.kind.as_ref().map(WorkItemKind::as_str)],
                ArchiveRow::from_row,
            )
            .map_err(InfraError::from)?;

        rows.into_iter().map(ArchiveRow::into_archive).collect()
    }

    fn append_audit(&mut self, entry: &AuditEntry) -> Result<()> {
        let sql = format!(
            "INSERT INTO audit_log ({AUDIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        );
        self.tx
            .execute(
                &sql,
                params![
                    entry.id,
                    entry.action.as_str(),
                    entry.actor_user_id,
                    to_millis(entry.occurred_at),
                    entry.reason,
                    entry.subject_id,
                    entry.original_work_item_id,
                    entry.kind.as_str(),
                ],
            )
            .map_err(InfraError::from)?;
        Ok(())
    }

    fn find_purge(&self, archive_id: &str) -> Result<Option<AuditEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_log
             WHERE subject_id = ?1 AND action = ?2
             ORDER BY occurred_at LIMIT 1"
        );
        self.tx
            .query_optional(
                &sql,
                params![archive_id, AuditAction::PermanentlyDeleted.as_str()],
                AuditRow::from_row,
            )
            .map_err(InfraError::from)?
            .map(AuditRow::into_entry)
            .transpose()
    }

    fn audit_for_work_item(&self, work_item_id: &str) -> Result<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_log
             WHERE original_work_item_id = ?1
             ORDER BY occurred_at, rowid"
        );
        let mut stmt = self.tx.prepare(&sql).map_err(InfraError::from)?;
        let rows =
            stmt.query_map(params![work_item_id], AuditRow::from_row).map_err(InfraError::from)?;

        rows.into_iter().map(AuditRow::into_entry).collect()
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().map_err(InfraError::from)?;
        Ok(())
    }
}

impl SqliteTransaction {
    fn hydrate_live(&self, row: LiveRow) -> Result<WorkItemRecord> {
        let status_history = self.load_status_history(&row.id)?;
        let timer_sessions = self.load_timer_sessions(&row.id)?;
        let manual_entries = self.load_manual_entries(&row.id)?;
        row.into_record(status_history, timer_sessions, manual_entries)
    }

    fn load_status_history(&self, record_id: &str) -> Result<Vec<StatusChange>> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT from_status, to_status, changed_by, changed_at
                 FROM status_changes WHERE record_id = ?1 ORDER BY seq",
            )
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![record_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(InfraError::from)?;

        rows.into_iter()
            .map(|(from, to, changed_by, changed_at)| {
                Ok(StatusChange {
                    from: parse_column(&from, "status_changes.from_status")?,
                    to: parse_column(&to, "status_changes.to_status")?,
                    changed_by,
                    changed_at: from_millis(changed_at, "status_changes.changed_at")?,
                })
            })
            .collect()
    }

    fn load_timer_sessions(&self, record_id: &str) -> Result<Vec<TimerSession>> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT started_at, ended_at, minutes, closed
                 FROM timer_sessions WHERE record_id = ?1 ORDER BY seq",
            )
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![record_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })
            .map_err(InfraError::from)?;

        rows.into_iter()
            .map(|(started_at, ended_at, minutes, closed)| {
                Ok(TimerSession {
                    started_at: from_millis(started_at, "timer_sessions.started_at")?,
                    ended_at: from_millis(ended_at, "timer_sessions.ended_at")?,
                    minutes,
                    closed,
                })
            })
            .collect()
    }

    fn load_manual_entries(&self, record_id: &str) -> Result<Vec<ManualTimeEntry>> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT id, duration_minutes, entry_date, created_by, created_at, note
                 FROM manual_time_entries WHERE record_id = ?1 ORDER BY seq",
            )
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![record_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })
            .map_err(InfraError::from)?;

        rows.into_iter()
            .map(|(id, duration_minutes, date, created_by, created_at, note)| {
                let date = NaiveDate::parse_from_str(&date, MANUAL_ENTRY_DATE_FORMAT).map_err(
                    |e| CaseLedgerError::StoreFailure(format!("manual_time_entries.entry_date: {e}")),
                )?;
                Ok(ManualTimeEntry {
                    id,
                    work_item_record_id: record_id.to_string(),
                    duration_minutes,
                    date,
                    created_by,
                    created_at: from_millis(created_at, "manual_time_entries.created_at")?,
                    note,
                })
            })
            .collect()
    }

    fn delete_control_rows(&self, record_id: &str) -> Result<()> {
        for table in ["status_changes", "timer_sessions", "manual_time_entries"] {
            self.tx
                .execute(&format!("DELETE FROM {table} WHERE record_id = ?1"), params![record_id])
                .map_err(InfraError::from)?;
        }
        Ok(())
    }

    fn insert_control_rows(&self, record: &WorkItemRecord) -> Result<()> {
        let mut insert = self.tx.prepare(INSERT_STATUS_CHANGE_SQL).map_err(InfraError::from)?;
        for (seq, change) in (0_i64..).zip(&record.status_history) {
            insert
                .execute(params![
                    record.id,
                    seq,
                    change.from.as_str(),
                    change.to.as_str(),
                    change.changed_by,
                    to_millis(change.changed_at),
                ])
                .map_err(InfraError::from)?;
        }

        let mut insert = self.tx.prepare(INSERT_TIMER_SESSION_SQL).map_err(InfraError::from)?;
        for (seq, session) in (0_i64..).zip(&record.timer_sessions) {
            insert
                .execute(params![
                    record.id,
                    seq,
                    to_millis(session.started_at),
                    to_millis(session.ended_at),
                    session.minutes,
                    session.closed,
                ])
                .map_err(InfraError::from)?;
        }

        let mut insert = self.tx.prepare(INSERT_MANUAL_ENTRY_SQL).map_err(InfraError::from)?;
        for (seq, entry) in (0_i64..).zip(&record.manual_entries) {
            insert
                .execute(params![
                    entry.id,
                    record.id,
                    seq,
                    entry.duration_minutes,
                    entry.date.format(MANUAL_ENTRY_DATE_FORMAT).to_string(),
                    entry.created_by,
                    to_millis(entry.created_at),
                    entry.note,
                ])
                .map_err(InfraError::from)?;
        }

        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
/* Row mapping */
/* -------------------------------------------------------------------------- */

struct LiveRow {
    id: String,
    work_item_id: String,
    item_json: String,
    owner_user_id: String,
    assignee_user_id: String,
    status: String,
    timer_running: bool,
    running_since: Option<i64>,
    total_time_minutes: u32,
    carried_over_minutes: u32,
    assigned_at: i64,
}

impl LiveRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            work_item_id: row.get(1)?,
            item_json: row.get(2)?,
            owner_user_id: row.get(3)?,
            assignee_user_id: row.get(4)?,
            status: row.get(5)?,
            timer_running: row.get(6)?,
            running_since: row.get(7)?,
            total_time_minutes: row.get(8)?,
            carried_over_minutes: row.get(9)?,
            assigned_at: row.get(10)?,
        })
    }

    fn into_record(
        self,
        status_history: Vec<StatusChange>,
        timer_sessions: Vec<TimerSession>,
        manual_entries: Vec<ManualTimeEntry>,
    ) -> Result<WorkItemRecord> {
        let item: WorkItem = serde_json::from_str(&self.item_json).map_err(InfraError::from)?;
        let timer = match (self.timer_running, self.running_since) {
            (true, Some(since)) => Timer::running(from_millis(since, "running_since")?),
            _ => Timer::stopped(),
        };

        Ok(WorkItemRecord {
            id: self.id,
            work_item_id: self.work_item_id,
            item,
            owner_user_id: self.owner_user_id,
            assignee_user_id: self.assignee_user_id,
            status: parse_column::<WorkItemStatus>(&self.status, "status")?,
            timer,
            total_time_minutes: self.total_time_minutes,
            carried_over_minutes: self.carried_over_minutes,
            assigned_at: from_millis(self.assigned_at, "assigned_at")?,
            status_history,
            timer_sessions,
            manual_entries,
        })
    }
}

struct ArchiveRow {
    id: String,
    original_work_item_id: String,
    kind: String,
    original_data: String,
    control_data: String,
    archived_by: String,
    archived_at: i64,
    archive_reason: Option<String>,
    restored_at: Option<i64>,
    restored_by: Option<String>,
    restored_record_id: Option<String>,
}

impl ArchiveRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            original_work_item_id: row.get(1)?,
            kind: row.get(2)?,
            original_data: row.get(3)?,
            control_data: row.get(4)?,
            archived_by: row.get(5)?,
            archived_at: row.get(6)?,
            archive_reason: row.get(7)?,
            restored_at: row.get(8)?,
            restored_by: row.get(9)?,
            restored_record_id: row.get(10)?,
        })
    }

    /// Unreadable snapshot documents surface as `InvalidSnapshot` so restore
    /// reports them the same way as a structurally inconsistent snapshot.
    fn into_archive(self) -> Result<ArchiveRecord> {
        let invalid = |half: &str, e: serde_json::Error| {
            CaseLedgerError::InvalidSnapshot(format!("archive {}: {half}: {e}", self.id))
        };
        let original_data =
            serde_json::from_str(&self.original_data).map_err(|e| invalid("original_data", e))?;
        let control_data =
            serde_json::from_str(&self.control_data).map_err(|e| invalid("control_data", e))?;

        let restoration = match (self.restored_at, self.restored_by) {
            (Some(at), Some(by)) => Some(Restoration {
                restored_at: from_millis(at, "restored_at")?,
                restored_by: by,
                restored_record_id: self.restored_record_id.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(ArchiveRecord {
            kind: parse_column(&self.kind, "kind")?,
            original_work_item_id: self.original_work_item_id,
            original_data,
            control_data,
            archived_by: self.archived_by,
            archived_at: from_millis(self.archived_at, "archived_at")?,
            archive_reason: self.archive_reason,
            restoration,
            id: self.id,
        })
    }
}

struct AuditRow {
    id: String,
    action: String,
    actor_user_id: String,
    occurred_at: i64,
    reason: Option<String>,
    subject_id: String,
    original_work_item_id: String,
    kind: String,
}

impl AuditRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            action: row.get(1)?,
            actor_user_id: row.get(2)?,
            occurred_at: row.get(3)?,
            reason: row.get(4)?,
            subject_id: row.get(5)?,
            original_work_item_id: row.get(6)?,
            kind: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<AuditEntry> {
        Ok(AuditEntry {
            id: self.id,
            action: parse_column(&self.action, "audit_log.action")?,
            actor_user_id: self.actor_user_id,
            occurred_at: from_millis(self.occurred_at, "audit_log.occurred_at")?,
            reason: self.reason,
            subject_id: self.subject_id,
            original_work_item_id: self.original_work_item_id,
            kind: parse_column(&self.kind, "audit_log.kind")?,
        })
    }
}

/* -------------------------------------------------------------------------- */
/* Column helpers */
/* -------------------------------------------------------------------------- */

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(millis: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        CaseLedgerError::StoreFailure(format!("{column}: timestamp {millis} out of range"))
    })
}

fn parse_column<T: FromStr<Err = String>>(value: &str, column: &str) -> Result<T> {
    value.parse().map_err(|e: String| CaseLedgerError::StoreFailure(format!("{column}: {e}")))
}

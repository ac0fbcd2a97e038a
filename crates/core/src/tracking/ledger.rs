//! Time ledger and single-slot timer
//!
//! Pure transitions over a [`WorkItemRecord`]. The caller supplies `now`, reads
//! the record inside a store transaction and writes it back afterwards.
//!
//! `total_time_minutes` only ever grows here: every running interval is
//! committed as a [`TimerSession`] and every manual block as a
//! [`ManualTimeEntry`], and both add to the total with saturating arithmetic.

use caseledger_domain::constants::{MAX_MANUAL_ENTRY_MINUTES, MAX_REASON_LENGTH};
use caseledger_domain::{
    CaseLedgerError, ManualEntryRequest, ManualTimeEntry, Result, Timer, TimerSession,
    WorkItemRecord,
};
use chrono::{DateTime, Utc};

/// Whole minutes between `since` and `now`, clamped at zero for clock skew
pub fn elapsed_minutes(since: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let minutes = (now - since).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Start the record's timer
///
/// # Errors
/// `AlreadyRunning` if the timer is running.
pub fn start(record: &mut WorkItemRecord, now: DateTime<Utc>) -> Result<()> {
    if record.timer.is_running {
        return Err(CaseLedgerError::AlreadyRunning(record.id.clone()));
    }

    record.timer = Timer::running(now);
    Ok(())
}

/// Pause the timer, committing the elapsed interval
///
/// # Errors
/// `NotRunning` if the timer is stopped.
pub fn pause(record: &mut WorkItemRecord, now: DateTime<Utc>) -> Result<TimerSession> {
    commit_running(record, now, false)
}

/// Stop the timer, committing the elapsed interval
///
/// The ledger treats stop and pause the same; the session only remembers which
/// one ended it.
///
/// # Errors
/// `NotRunning` if the timer is stopped.
pub fn stop(record: &mut WorkItemRecord, now: DateTime<Utc>) -> Result<TimerSession> {
    commit_running(record, now, true)
}

fn commit_running(
    record: &mut WorkItemRecord,
    now: DateTime<Utc>,
    closed: bool,
) -> Result<TimerSession> {
    let started_at = match record.timer {
        Timer { is_running: true, running_since: Some(since) } => since,
        _ => return Err(CaseLedgerError::NotRunning(record.id.clone())),
    };

    let minutes = elapsed_minutes(started_at, now);
    let session = TimerSession { started_at, ended_at: now.max(started_at), minutes, closed };

    record.total_time_minutes = record.total_time_minutes.saturating_add(minutes);
    record.timer_sessions.push(session.clone());
    record.timer = Timer::stopped();

    Ok(session)
}

/// Append a manual time block and add it to the total
///
/// # Errors
/// `InvalidDuration` if the duration is not positive or exceeds one year;
/// `InvalidInput` if the note is too long.
pub fn add_manual_entry(
    record: &mut WorkItemRecord,
    request: ManualEntryRequest,
    entry_id: String,
    created_by: &str,
    now: DateTime<Utc>,
) -> Result<ManualTimeEntry> {
    let duration_minutes = validate_duration(request.duration_minutes)?;

    let note = request.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if note.as_ref().is_some_and(|n| n.len() > MAX_REASON_LENGTH) {
        return Err(CaseLedgerError::InvalidInput(format!(
            "note exceeds {MAX_REASON_LENGTH} characters"
        )));
    }

    let entry = ManualTimeEntry {
        id: entry_id,
        work_item_record_id: record.id.clone(),
        duration_minutes,
        date: request.date,
        created_by: created_by.to_string(),
        created_at: now,
        note,
    };

    record.total_time_minutes = record.total_time_minutes.saturating_add(duration_minutes);
    record.manual_entries.push(entry.clone());

    Ok(entry)
}

fn validate_duration(minutes: i64) -> Result<u32> {
    if minutes <= 0 || minutes > MAX_MANUAL_ENTRY_MINUTES {
        return Err(CaseLedgerError::InvalidDuration(minutes));
    }
    u32::try_from(minutes).map_err(|_| CaseLedgerError::InvalidDuration(minutes))
}

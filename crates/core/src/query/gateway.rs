//! Query gateway - the only read path for lists of work items
//!
//! The caller's broadest `view` scope decides what reaches the store: `own`
//! pins the owner to the caller, `team` and `all` leave it open. Caller
//! filters run afterwards over that already-limited set, so a requested owner
//! filter can narrow a listing but never widen it.

use std::cmp::Reverse;
use std::sync::Arc;

use caseledger_domain::{
    Action, Actor, ArchiveAnalytics, ArchiveExportRow, ArchiveQuery, ArchiveRecord, LiveQuery,
    Resource, Result, StoreFilter, WorkItemKind, WorkItemRecord,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::access::PermissionEngine;
use crate::store::{atomically, WorkItemStore};

/// Query gateway
pub struct QueryGateway {
    store: Arc<dyn WorkItemStore>,
    permissions: PermissionEngine,
}

impl QueryGateway {
    /// Create a new query gateway
    pub fn new(store: Arc<dyn WorkItemStore>) -> Self {
        Self { store, permissions: PermissionEngine::new() }
    }

    /// Live records of `kind` visible to `actor`, newest assignment first
    ///
    /// # Errors
    /// `Forbidden` without any `<kind>.view` grant.
    pub fn list_live(
        &self,
        actor: &Actor,
        kind: WorkItemKind,
        query: &LiveQuery,
    ) -> Result<Vec<WorkItemRecord>> {
        let filter = self.permissions.visibility(actor, kind.resource(), Action::View)?.with_kind(kind);
        let needle = normalize_text(query.text.as_deref());

        let mut records = atomically(self.store.as_ref(), |tx| tx.list_live(&filter))?;
        records.retain(|record| {
            filter.matches_live(record)
                && query.owner_user_id.as_deref().map_or(true, |o| record.owner_user_id == o)
                && query.status.map_or(true, |s| record.status == s)
                && in_range(record.assigned_at, query.assigned_from, query.assigned_to)
                && needle.as_deref().map_or(true, |n| record.item.matches_text(n))
        });
        records.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at).then_with(|| a.id.cmp(&b.id)));

        debug!(actor = %actor.user_id, %kind, count = records.len(), "listed live records");
        Ok(records)
    }

    /// Archives visible to `actor`, newest first
    ///
    /// # Errors
    /// `Forbidden` without any `archive.view` grant.
    pub fn list_archived(&self, actor: &Actor, query: &ArchiveQuery) -> Result<Vec<ArchiveRecord>> {
        let archives = self.visible_archives(actor, Action::View, query)?;
        debug!(actor = %actor.user_id, count = archives.len(), "listed archives");
        Ok(archives)
    }

    /// Totals over the archives visible to `actor`
    ///
    /// # Errors
    /// `Forbidden` without any `archive.analytics` grant.
    pub fn analytics(&self, actor: &Actor) -> Result<ArchiveAnalytics> {
        let archives = self.visible_archives(actor, Action::Analytics, &ArchiveQuery::default())?;

        Ok(archives.iter().fold(ArchiveAnalytics::default(), |mut totals, archive| {
            totals.archived_total += 1;
            if archive.is_restored() {
                totals.restored_total += 1;
            }
            match archive.kind {
                WorkItemKind::Case => totals.cases += 1,
                WorkItemKind::Todo => totals.todos += 1,
            }
            totals.archived_minutes += u64::from(archive.control_data.total_time_minutes);
            totals
        }))
    }

    /// Flat export rows for the archives visible to `actor`
    ///
    /// # Errors
    /// `Forbidden` without any `archive.export` grant.
    pub fn export(&self, actor: &Actor, query: &ArchiveQuery) -> Result<Vec<ArchiveExportRow>> {
        let archives = self.visible_archives(actor, Action::Export, query)?;
        Ok(archives.iter().map(ArchiveExportRow::from).collect())
    }

    fn visible_archives(
        &self,
        actor: &Actor,
        action: Action,
        query: &ArchiveQuery,
    ) -> Result<Vec<ArchiveRecord>> {
        let mut filter: StoreFilter = self.permissions.visibility(actor, Resource::Archive, action)?;
        filter.kind = query.kind;
        let needle = normalize_text(query.text.as_deref());

        let mut archives = atomically(self.store.as_ref(), |tx| tx.list_archive(&filter))?;
        archives.retain(|archive| {
            filter.matches_archive(archive)
                && query.owner_user_id.as_deref().map_or(true, |o| archive.owner_user_id() == o)
                && query.restored.map_or(true, |r| archive.is_restored() == r)
                && in_range(archive.archived_at, query.archived_from, query.archived_to)
                && needle.as_deref().map_or(true, |n| archive.original_data.item.matches_text(n))
        });
        archives.sort_by_key(|archive| (Reverse(archive.archived_at), archive.id.clone()));

        Ok(archives)
    }
}

fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_lowercase)
}

fn in_range(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |from| at >= from) && to.map_or(true, |to| at <= to)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn blank_text_is_no_filter() {
        assert_eq!(normalize_text(None), None);
        assert_eq!(normalize_text(Some("   ")), None);
        assert_eq!(normalize_text(Some(" Vendor ")), Some("vendor".to_string()));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let at = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert!(in_range(at, Some(at), Some(at)));
        assert!(in_range(at, None, None));
        assert!(!in_range(at, Some(at + chrono::Duration::seconds(1)), None));
        assert!(!in_range(at, None, Some(at - chrono::Duration::seconds(1))));
    }
}

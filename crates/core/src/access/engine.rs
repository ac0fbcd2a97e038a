//! Permission evaluation for `own`/`team`/`all` grants
//!
//! Every mutating call and every listing passes through here first. The engine
//! is pure: it reads the actor's capability set and nothing else, so the same
//! question always gets the same answer and nothing is cached.
//!
//! A `team` grant is a blanket grant. It is evaluated exactly like `all` and
//! does not look at team membership.

use caseledger_domain::{Action, Actor, CaseLedgerError, Resource, Result, Scope, StoreFilter};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEngine;

impl PermissionEngine {
    pub const fn new() -> Self {
        Self
    }

    /// Whether `actor` may perform `action` on a `resource` owned by
    /// `owner_user_id`
    pub fn can_perform(
        &self,
        actor: &Actor,
        resource: Resource,
        action: Action,
        owner_user_id: &str,
    ) -> bool {
        (owner_user_id == actor.user_id && actor.has(resource, action, Scope::Own))
            || actor.has(resource, action, Scope::Team)
            || actor.has(resource, action, Scope::All)
    }

    /// Broadest scope the actor holds for `resource.action`, if any
    pub fn highest_scope(&self, actor: &Actor, resource: Resource, action: Action) -> Option<Scope> {
        [Scope::All, Scope::Team, Scope::Own]
            .into_iter()
            .find(|scope| actor.has(resource, action, *scope))
    }

    /// [`Self::can_perform`] as a `Result`
    ///
    /// # Errors
    /// `Forbidden` on denial. The error never names the missing grant.
    pub fn authorize(
        &self,
        actor: &Actor,
        resource: Resource,
        action: Action,
        owner_user_id: &str,
    ) -> Result<()> {
        if self.can_perform(actor, resource, action, owner_user_id) {
            return Ok(());
        }

        deny(actor, resource, action)
    }

    /// Require the `all` scope, for administrative maintenance
    ///
    /// # Errors
    /// `Forbidden` unless the actor holds `resource.action_all`.
    pub fn authorize_admin(&self, actor: &Actor, resource: Resource, action: Action) -> Result<()> {
        if actor.has(resource, action, Scope::All) {
            return Ok(());
        }

        deny(actor, resource, action)
    }

    /// Require any grant for `resource.action` and return the broadest one
    ///
    /// Used where there is no owner to evaluate against yet, such as listings
    /// or ids that no longer resolve to a row.
    ///
    /// # Errors
    /// `Forbidden` if the actor holds no scope at all.
    pub fn require_any(&self, actor: &Actor, resource: Resource, action: Action) -> Result<Scope> {
        match self.highest_scope(actor, resource, action) {
            Some(scope) => Ok(scope),
            None => deny(actor, resource, action),
        }
    }

    /// [`Self::require_any`] over several resources, passing if any one of
    /// them carries a grant for `action`
    ///
    /// # Errors
    /// `Forbidden` if none of `resources` grants `action` at any scope.
    pub fn require_any_of(
        &self,
        actor: &Actor,
        resources: impl IntoIterator<Item = Resource>,
        action: Action,
    ) -> Result<()> {
        if resources.into_iter().any(|resource| self.highest_scope(actor, resource, action).is_some()) {
            return Ok(());
        }

        debug!(actor = %actor.user_id, %action, "permission denied for every resource");
        Err(CaseLedgerError::Forbidden)
    }

    /// Store-level constraint that limits a listing to what the actor may see
    ///
    /// # Errors
    /// `Forbidden` if the actor holds no scope for `resource.action`.
    pub fn visibility(&self, actor: &Actor, resource: Resource, action: Action) -> Result<StoreFilter> {
        Ok(match self.require_any(actor, resource, action)? {
            Scope::Own => StoreFilter::owned_by(actor.user_id.clone()),
            Scope::Team | Scope::All => StoreFilter::unrestricted(),
        })
    }
}

fn deny<T>(actor: &Actor, resource: Resource, action: Action) -> Result<T> {
    debug!(actor = %actor.user_id, %resource, %action, "permission denied");
    Err(CaseLedgerError::Forbidden)
}

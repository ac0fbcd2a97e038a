//! Actors and the capability grammar
//!
//! A capability is a `(resource, action, scope)` grant written as
//! `resource.action_scope`, for example `archive.create_own` or
//! `todo.track_time_team`. Scopes are ordered `own < team < all`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CaseLedgerError;
use crate::impl_domain_enum_conversions;

/// Kind of thing a capability applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Case,
    Todo,
    Archive,
    System,
}

impl_domain_enum_conversions!(Resource {
    Case => "case",
    Todo => "todo",
    Archive => "archive",
    System => "system",
});

/// Operation a capability allows on its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Update,
    TrackTime,
    Restore,
    Delete,
    Analytics,
    Export,
    Maintain,
}

impl_domain_enum_conversions!(Action {
    View => "view",
    Create => "create",
    Update => "update",
    TrackTime => "track_time",
    Restore => "restore",
    Delete => "delete",
    Analytics => "analytics",
    Export => "export",
    Maintain => "maintain",
});

/// Breadth of a grant. Declaration order gives `Own < Team < All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Own,
    Team,
    All,
}

impl_domain_enum_conversions!(Scope {
    Own => "own",
    Team => "team",
    All => "all",
});

/// A single grant held by an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Capability {
    pub resource: Resource,
    pub action: Action,
    pub scope: Scope,
}

impl Capability {
    pub const fn new(resource: Resource, action: Action, scope: Scope) -> Self {
        Self { resource, action, scope }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}_{}", self.resource, self.action, self.scope)
    }
}

impl FromStr for Capability {
    type Err = CaseLedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CaseLedgerError::InvalidInput(format!("Invalid capability: {s}"));

        let (resource, rest) = s.trim().split_once('.').ok_or_else(invalid)?;
        // Actions may contain underscores (`track_time`), so the scope is the
        // last segment.
        let (action, scope) = rest.rsplit_once('_').ok_or_else(invalid)?;

        Ok(Self {
            resource: resource.parse().map_err(|_| invalid())?,
            action: action.parse().map_err(|_| invalid())?,
            scope: scope.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for Capability {
    type Error = CaseLedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Capability> for String {
    fn from(value: Capability) -> Self {
        value.to_string()
    }
}

/// The caller of an operation
///
/// Supplied by the session layer and passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), team_id: None, capabilities: BTreeSet::new() }
    }

    /// Build an actor from textual grants such as `"case.view_own"`
    ///
    /// # Errors
    /// Returns `InvalidInput` for the first grant that doesn't parse.
    pub fn with_grants<I, S>(user_id: impl Into<String>, grants: I) -> Result<Self, CaseLedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let capabilities = grants
            .into_iter()
            .map(|grant| grant.as_ref().parse())
            .collect::<Result<BTreeSet<Capability>, _>>()?;

        Ok(Self { user_id: user_id.into(), team_id: None, capabilities })
    }

    #[must_use]
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Whether the actor holds exactly this grant
    pub fn has(&self, resource: Resource, action: Action, scope: Scope) -> bool {
        self.capabilities.contains(&Capability::new(resource, action, scope))
    }
}

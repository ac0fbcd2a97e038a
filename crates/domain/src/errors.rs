//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for CaseLedger
///
/// Every variant is a stable, distinguishable kind. Authorization and
/// validation failures are ordinary values returned to the caller; only
/// `StoreFailure` signals a persistence problem, and it is only ever returned
/// after the enclosing transaction was rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CaseLedgerError {
    /// Authorization denied. Deliberately carries no detail.
    #[error("Forbidden")]
    Forbidden,

    #[error("Not eligible for archive: status is {0}")]
    NotEligibleForArchive(String),

    #[error("Archive record {0} has already been restored")]
    AlreadyRestored(String),

    #[error("Archive record {0} has already been permanently deleted")]
    AlreadyDeleted(String),

    #[error("Timer is already running for record {0}")]
    AlreadyRunning(String),

    #[error("Timer is not running for record {0}")]
    NotRunning(String),

    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaseLedgerError {
    /// Stable label suitable for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::NotEligibleForArchive(_) => "not_eligible_for_archive",
            Self::AlreadyRestored(_) => "already_restored",
            Self::AlreadyDeleted(_) => "already_deleted",
            Self::AlreadyRunning(_) => "already_running",
            Self::NotRunning(_) => "not_running",
            Self::InvalidDuration(_) => "invalid_duration",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidSnapshot(_) => "invalid_snapshot",
            Self::StoreFailure(_) => "store_failure",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the failure is an expected business outcome rather than an
    /// infrastructure problem
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::StoreFailure(_) | Self::Config(_) | Self::Internal(_))
    }
}

/// Result type alias for CaseLedger operations
pub type Result<T> = std::result::Result<T, CaseLedgerError>;

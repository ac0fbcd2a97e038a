//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

// Time accounting
pub const MANUAL_ENTRY_DATE_FORMAT: &str = "%Y-%m-%d";
/// Upper bound for a single manual entry (one year of minutes)
pub const MAX_MANUAL_ENTRY_MINUTES: i64 = 525_600;

// Configuration defaults
pub const DEFAULT_DATABASE_PATH: &str = "caseledger.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Text limits
pub const MAX_REASON_LENGTH: usize = 1_000;
pub const MAX_SEARCH_TEXT_LENGTH: usize = 200;

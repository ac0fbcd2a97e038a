//! Storage primitives for SQLite-backed stores
//!
//! This module provides the pooled connection layer used by the
//! infrastructure adapters: r2d2 pooling, per-connection pragmas, an owned
//! immediate-mode transaction, and lightweight metrics.

pub mod error;
pub mod metrics;
pub mod sqlite;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlite::{
    apply_connection_pragmas, ImmediateTransaction, SqliteConnection, SqlitePool,
    SqlitePoolConfig, SqliteStatement,
};
pub use types::{HealthStatus, PoolMetrics};

//! # CaseLedger Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The SQLite work-item store and entity directory
//! - Schema management and health checks
//! - Configuration loading (environment, `.env`, JSON/TOML files)
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `caseledger-core`
//! - Depends on `caseledger-common` for pooling and `caseledger-domain` for types
//! - Contains all "impure" code (file and database I/O)

pub mod config;
pub mod database;
pub mod errors;
pub mod observability;

// Re-export commonly used items
pub use database::*;
pub use errors::InfraError;
pub use observability::init_tracing;

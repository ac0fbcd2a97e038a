//! # CaseLedger Domain
//!
//! Business domain types and models for CaseLedger.
//!
//! This crate contains:
//! - Work items, live records, timers and manual time entries
//! - Archive snapshots, audit entries and lifecycle states
//! - The capability grammar (`resource.action_scope`) and actors
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other CaseLedger crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

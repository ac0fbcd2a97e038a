//! # CaseLedger Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The permission engine for scoped capabilities
//! - The time ledger and the live work-item service
//! - The archive engine (archive, restore, purge, orphan reconciliation)
//! - The query gateway (listings, analytics, export)
//! - Port interfaces (traits) for the store and the entity directory
//!
//! ## Architecture Principles
//! - Only depends on `caseledger-common` and `caseledger-domain`
//! - No database or platform code
//! - All external dependencies via traits
//! - Synchronous: every operation completes or fails atomically in one
//!   store transaction

pub mod access;
pub mod archive;
pub mod query;
pub mod store;
pub mod tracking;

pub use access::PermissionEngine;
pub use archive::ArchiveEngine;
pub use query::QueryGateway;
pub use store::{atomically, EntityDirectory, StoreTransaction, WorkItemStore};
pub use tracking::WorkItemService;

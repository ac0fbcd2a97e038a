//! Time accounting and live work-item operations

pub mod ledger;
pub mod service;

pub use service::WorkItemService;

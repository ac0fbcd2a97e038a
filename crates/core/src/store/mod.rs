//! Persistence and directory ports

pub mod ports;

pub use ports::{atomically, EntityDirectory, StoreTransaction, WorkItemStore};

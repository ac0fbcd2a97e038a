//! Archival, restoration and permanent deletion

pub mod service;
pub mod snapshot;

pub use service::ArchiveEngine;

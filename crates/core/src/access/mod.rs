//! Scoped capability evaluation

pub mod engine;

pub use engine::PermissionEngine;

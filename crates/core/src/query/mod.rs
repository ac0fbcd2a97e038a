//! Scope-filtered listings, analytics and export

pub mod gateway;

pub use gateway::QueryGateway;

//! Shared test helpers for `caseledger-core` integration tests.
//!
//! These helpers provide an in-memory store, an in-memory entity directory and
//! a fully wired harness so that scenario tests can focus on behaviour instead
//! of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod repositories;

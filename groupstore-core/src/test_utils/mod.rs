//! Test utilities and helpers for groupstore
//!
//! Fixtures that build stores, users and nested groups, plus assertions
//! over member sets. Shared by unit tests, integration tests and benches.

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;

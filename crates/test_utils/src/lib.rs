//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! cargo quoting test suites.
//!
//! # Modules
//!
//! - `fixtures`: A known catalogue and quote request for scenario tests
//! - `builders`: Builder patterns for test data construction
//! - `assertions`: Assertion helpers for rating invariants
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;

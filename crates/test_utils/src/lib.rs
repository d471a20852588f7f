//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! dynamic data test suites.
//!
//! # Modules
//!
//! - `fixtures`: Ready-made contexts over the sample types, and claim sets
//! - `builders`: Builder patterns for records
//! - `database`: Database test helpers and container management
//! - `assertions`: Assertion helpers for errors, views and pages
//! - `generators`: Property-based and fake data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;

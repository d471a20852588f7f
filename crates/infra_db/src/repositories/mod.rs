//! Repository implementations
//!
//! A single generic repository serves every registered data type; the
//! descriptor supplies what per-type repositories would otherwise hard-code.

mod changes;
pub mod generic;

pub use generic::Repository;

//! Store adapters
//!
//! Implementations of the core store ports:
//! - `memory`: lock-guarded maps, used by tests and the demo server
//! - `postgres`: JSONB-backed tables on PostgreSQL via SQLx
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PgDataStore;
//!
//! let store = PgDataStore::new(pool);
//! let item = store.get("Country", id).await?;
//! ```

pub mod memory;
pub mod postgres;

pub use memory::{MemoryShareStore, MemoryStore};
pub use postgres::{PgDataStore, PgShareStore};

//! Infrastructure Database Layer
//!
//! This crate provides storage for the dynamic data system and the generic
//! repository that works on top of it.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Stores implement the
//! `DataStore` and `SharePort` ports from `core_kernel`; a [`DataContext`]
//! binds a store to the type registry and hands out one [`Repository`] per
//! data type.
//!
//! # Storage model
//!
//! Every record is a row of `data_items` holding its data type, a version
//! counter and its fields as a JSON object. Foreign keys are fields holding
//! the referenced id, so relationships need no per-type schema.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DataContext, DatabaseConfig, PgDataStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/dynamic_data")).await?;
//! let context = DataContext::new(registry, Arc::new(PgDataStore::new(pool)));
//! let countries = context.repository("Country")?;
//! ```

pub mod adapters;
pub mod context;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{MemoryShareStore, MemoryStore, PgDataStore, PgShareStore};
pub use context::DataContext;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::Repository;

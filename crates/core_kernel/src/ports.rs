//! Ports and Adapters Infrastructure
//!
//! This module provides the port traits the generic repository depends on,
//! and the error type every adapter reports through.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Generic Repository                       │
//! │          (one per registered data type, infra_db)            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DataStore / SharePort                      │
//! │                 Defined here in core_kernel                  │
//! └─────────────────────────────────────────────────────────────┘
//!                    ▲                         ▲
//!                    │                         │
//!         ┌─────────┴─────────┐     ┌────────┴────────┐
//!         │  Memory Adapter   │     │ Postgres Adapter │
//!         │  (tests, demo)    │     │  (sqlx, JSONB)   │
//!         └───────────────────┘     └──────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::identifiers::ItemId;
use crate::value::DataItem;

/// Failure reported by a store adapter
///
/// Memory and database adapters report through this one type, so the
/// repository handles both the same way.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{data_type} with id '{id}' not found")]
    NotFound { data_type: String, id: String },

    /// A stored value or constraint rejected the write
    #[error("Rejected by store: {0}")]
    Rejected(String),

    /// Stale version or duplicate id
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend cannot be reached right now; the call may succeed later
    #[error("Store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Internal store error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(data_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            data_type: data_type.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        PortError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortError::Unavailable { .. })
    }
}

/// One write of a batch passed to [`DataStore::apply`]
#[derive(Debug, Clone)]
pub enum StoreWrite {
    Insert(DataItem),
    /// Replaces the record's fields; `version` must match the stored one
    Update(DataItem),
    /// Deleting an absent record is not an error
    Delete { data_type: String, id: ItemId },
}

impl StoreWrite {
    pub fn delete(data_type: impl Into<String>, id: ItemId) -> Self {
        StoreWrite::Delete {
            data_type: data_type.into(),
            id,
        }
    }

    pub fn data_type(&self) -> &str {
        match self {
            StoreWrite::Insert(item) | StoreWrite::Update(item) => &item.data_type,
            StoreWrite::Delete { data_type, .. } => data_type,
        }
    }

    pub fn id(&self) -> ItemId {
        match self {
            StoreWrite::Insert(item) | StoreWrite::Update(item) => item.id,
            StoreWrite::Delete { id, .. } => *id,
        }
    }
}

/// Marker trait for all ports
///
/// All port traits extend this marker so adapters are thread-safe and can
/// be shared between requests behind an `Arc`.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Adapter identifier
    pub adapter_id: String,
    /// Current health status
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    /// Timestamp of the health check
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    /// A healthy result for adapters with nothing to check
    pub fn healthy(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn is_operational(&self) -> bool {
        self.status == AdapterHealth::Healthy
    }
}

/// Trait for adapters that support health checks
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

/// Backing store for records of every registered data type
///
/// Stores know nothing about descriptors: they persist [`DataItem`]s keyed
/// by `(data_type, id)` and enforce optimistic concurrency on `version`.
#[async_trait]
pub trait DataStore: DomainPort + HealthCheckable {
    /// Fetches one record
    async fn get(&self, data_type: &str, id: ItemId) -> Result<Option<DataItem>, PortError>;

    /// Fetches every record of a type
    async fn list(&self, data_type: &str) -> Result<Vec<DataItem>, PortError>;

    /// Fetches the records of a type whose `field` equals `value`
    async fn find_by_field(
        &self,
        data_type: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<DataItem>, PortError>;

    /// Counts the records of a type
    async fn count(&self, data_type: &str) -> Result<usize, PortError>;

    /// Inserts a new record
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` if the id is already taken
    async fn insert(&self, item: DataItem) -> Result<DataItem, PortError>;

    /// Replaces a record's fields
    ///
    /// `item.version` must equal the stored version; the stored copy is
    /// returned with the version incremented.
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if the record is gone, `PortError::Conflict` if
    /// the version no longer matches
    async fn update(&self, item: DataItem) -> Result<DataItem, PortError>;

    /// Deletes a record; returns whether it existed
    async fn delete(&self, data_type: &str, id: ItemId) -> Result<bool, PortError>;

    /// Applies every write of the batch, or none of them
    ///
    /// Writes run in order with the same checks as the single-record calls.
    /// The first failing write aborts the batch and nothing is stored.
    async fn apply(&self, writes: Vec<StoreWrite>) -> Result<(), PortError>;

    /// Fetches several records, skipping ids that do not resolve
    async fn get_many(&self, data_type: &str, ids: &[ItemId]) -> Result<Vec<DataItem>, PortError> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.get(data_type, *id).await? {
                items.push(item);
            }
        }
        Ok(items)
    }
}

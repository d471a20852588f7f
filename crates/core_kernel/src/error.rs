//! Core error types used across the system

use thiserror::Error;

use crate::ports::PortError;

/// Core error type returned by repository operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Concurrent modification; callers reload and retry
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unknown data type or navigation, or a navigation used in a way its
    /// relationship does not support. A programming error, not recoverable.
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The store could not be reached; the same request may succeed later
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        CoreError::Schema(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        CoreError::Unauthorized(message.into())
    }

    /// Creates a NotFound error for a data type and identifier
    pub fn item_not_found(data_type: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{} with id '{}' not found", data_type, id))
    }

    /// Returns true if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }

    /// Returns true if the caller should reload and retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }

    /// Returns true if the request may succeed unchanged once the store recovers
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Unavailable(_))
    }
}

impl From<PortError> for CoreError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { data_type, id } => CoreError::item_not_found(&data_type, id),
            PortError::Rejected(message) => CoreError::Validation(message),
            PortError::Conflict(message) => CoreError::Conflict(message),
            other if other.is_retryable() => CoreError::Unavailable(other.to_string()),
            other => CoreError::Storage(other.to_string()),
        }
    }
}

//! Error Types
//!
//! This module defines the error types used across the sync engine. Each
//! failure domain has its own enum so callers can tell a storage fault (fatal
//! to the attempted mutation) from a remote fault (retried in the background).
//!
//! # Error Categories
//!
//! - `SharedError` - Payload validation and serialization failures
//! - `StorageError` - Local durable store failures
//! - `RemoteError` - Remote entity store failures, classified as retryable or permanent
//! - `SyncError` - Umbrella error returned by the public service surface
//!
//! # Usage
//!
//! ```rust
//! use tasksync::shared::error::{RemoteError, SharedError};
//!
//! let error = SharedError::validation("title", "Task title cannot be empty");
//! assert!(error.to_string().contains("title"));
//!
//! assert!(RemoteError::Timeout.is_retryable());
//! assert!(!RemoteError::Validation("bad date".into()).is_retryable());
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across thread boundaries.
use crate::shared::config::ConfigError;
use thiserror::Error;

/// Errors raised before a mutation reaches the local store
#[derive(Debug, Error, Clone)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

/// Local durable store failures.
///
/// A storage error is never swallowed: the mutation or sync step that hit it
/// fails and the error reaches the caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error preparing the database: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row in '{table}': {message}")]
    Corrupt {
        table: &'static str,
        message: String,
    },

    #[error("Unknown index '{index}' on '{table}'")]
    UnknownIndex {
        table: &'static str,
        index: String,
    },
}

impl StorageError {
    pub fn corrupt(table: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            table,
            message: message.into(),
        }
    }
}

/// Remote entity store failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection refused, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// 5xx responses
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// 408 / 429 responses
    #[error("Rate limited ({status})")]
    RateLimited { status: u16 },

    /// 400 / 422 responses
    #[error("Validation rejected: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// 401 / 403 responses
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other 4xx response
    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Network(_)
                | RemoteError::Timeout
                | RemoteError::Server { .. }
                | RemoteError::RateLimited { .. }
        )
    }

    /// Classify an HTTP status code that is not a success
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 | 429 => RemoteError::RateLimited { status },
            400 | 422 => RemoteError::Validation(message),
            401 | 403 => RemoteError::Unauthorized(message),
            404 => RemoteError::NotFound(message),
            409 => RemoteError::Conflict(message),
            500..=599 => RemoteError::Server { status, message },
            _ => RemoteError::Rejected { status, message },
        }
    }
}

/// Umbrella error for the public sync surface
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Invalid(#[from] SharedError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

//! Shared Module
//!
//! This module contains the platform-agnostic types used by the local store,
//! the sync engine and the remote adapters: domain entities, pending
//! operations, errors and configuration.

/// Projects, tasks, time trackings and time blocks
pub mod entities;

/// Pending operation model and entity payload union
pub mod operation;

/// Error types
pub mod error;

/// Sync configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, RetrySettings, SyncConfig, SyncConfigBuilder};
pub use entities::{Project, SyncEntity, Task, TaskPriority, TaskStatus, TimeBlock, TimeTracking};
pub use error::{RemoteError, SharedError, StorageError, SyncError};
pub use operation::{EntityPayload, EntityType, OperationKind, PendingOperation};

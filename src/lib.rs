//! TaskSync - Main Library
//!
//! TaskSync is the offline-first synchronization engine of a task manager.
//! Local mutations of projects, hierarchical tasks, time trackings and
//! calendar time blocks are applied to a durable local cache immediately and
//! delivered to a remote entity store in the background, with exponential
//! backoff, whenever connectivity allows.
//!
//! # Overview
//!
//! This library provides:
//! - A SQLite-backed local store for cached entities and pending operations
//! - Optimistic, transactional local mutations (phase 1)
//! - Ordered, single-flight, retried delivery to the remote store (phase 2)
//! - Connectivity- and timer-triggered sync passes
//! - A pending-count notifier for UI collaborators
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic types
//!   - Entities, pending operations and their tagged payloads
//!   - Error types
//!   - Configuration
//!
//! - **`client`** - The sync engine
//!   - `local_db`: durable local store
//!   - `offline`: mutations, operation log, retry engine, id reconciliation
//!   - `remote`: remote entity store trait, HTTP and in-memory stores
//!   - `sync`: sync service, adapters, connectivity monitor, notifier
//!   - `context`: wiring of all of the above
//!
//! # Usage
//!
//! ```rust,no_run
//! use tasksync::client::SyncContext;
//! use tasksync::shared::{SyncConfig, Task};
//!
//! # async fn example() -> Result<(), tasksync::shared::SyncError> {
//! let config = SyncConfig::load(None)?;
//! let context = SyncContext::open(config).await?;
//! let monitor = context.monitor().spawn();
//!
//! context.offline().create(Task::new("Buy milk")).await?;
//!
//! // Connectivity signals come from the host platform
//! context.set_online(false);
//! context.set_online(true);
//! # monitor.abort();
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Every component is `Send + Sync` and shared through `Arc`. The local
//! database is the only shared mutable resource and is accessed exclusively
//! through `LocalDatabase` methods.
//!
//! # Error Handling
//!
//! - `Result<T, E>` for fallible operations
//! - One error enum per failure domain in `shared::error`
//! - Remote failures never reach mutation call sites; they surface through the
//!   pending count and the stalled-operation list

/// Shared types and data structures
pub mod shared;

/// Offline-first sync engine
pub mod client;

//! # Remote Entity Store
//!
//! The contract the sync engine needs from the remote source of truth: create,
//! update and delete per entity type, returning the canonical record or a
//! classified [`RemoteError`].
//!
//! ## Implementations
//!
//! - `http.rs`: REST client over `reqwest`
//! - `memory.rs`: in-process store with failure injection, for tests and demos

pub mod http;
pub mod memory;

pub use http::HttpRemoteStore;
pub use memory::{InMemoryRemoteStore, RemoteCall};

use crate::shared::entities::{Project, SyncEntity, Task, TimeBlock, TimeTracking};
use crate::shared::error::RemoteError;
use async_trait::async_trait;

/// Remote CRUD for one entity type
#[async_trait]
pub trait RemoteEntityStore<E: SyncEntity>: Send + Sync {
    /// Create the record; returns the canonical record as stored remotely
    async fn create(&self, entity: &E) -> Result<E, RemoteError>;

    /// Replace the record with the full payload
    async fn update(&self, entity: &E) -> Result<(), RemoteError>;

    async fn delete(&self, entity_id: &str) -> Result<(), RemoteError>;
}

/// A remote store serving every entity type the engine syncs
pub trait RemoteStore:
    RemoteEntityStore<Task>
    + RemoteEntityStore<Project>
    + RemoteEntityStore<TimeTracking>
    + RemoteEntityStore<TimeBlock>
    + 'static
{
}

impl<T> RemoteStore for T where
    T: RemoteEntityStore<Task>
        + RemoteEntityStore<Project>
        + RemoteEntityStore<TimeTracking>
        + RemoteEntityStore<TimeBlock>
        + 'static
{
}

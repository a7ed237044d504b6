//! # Entity Sync Adapters
//!
//! One adapter per entity type, translating a pending operation into a remote
//! create/update/delete call. Adapters never fail past their boundary: every
//! remote error becomes a tagged [`SyncOutcome`] that tells the retry engine
//! whether trying again can help.

use crate::client::remote::{RemoteEntityStore, RemoteStore};
use crate::shared::entities::{Project, SyncEntity, Task, TimeBlock, TimeTracking};
use crate::shared::error::RemoteError;
use crate::shared::operation::{EntityPayload, OperationKind, PendingOperation};
use std::sync::Arc;

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Delivered. `canonical_id` is set when the remote stored a create under a different id.
    Success { canonical_id: Option<String> },
    /// Network, timeout, 5xx, rate limiting
    RetryableFailure(String),
    /// Validation, conflict, authorization; retrying the same payload won't help
    PermanentFailure(String),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }

    fn from_result(result: Result<Option<String>, RemoteError>) -> Self {
        match result {
            Ok(canonical_id) => SyncOutcome::Success { canonical_id },
            Err(error) if error.is_retryable() => SyncOutcome::RetryableFailure(error.to_string()),
            Err(error) => SyncOutcome::PermanentFailure(error.to_string()),
        }
    }
}

/// Delivers operations of a single entity type
pub struct EntityAdapter<E: SyncEntity> {
    remote: Arc<dyn RemoteEntityStore<E>>,
}

impl<E: SyncEntity> Clone for EntityAdapter<E> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
        }
    }
}

impl<E: SyncEntity> EntityAdapter<E> {
    pub fn new(remote: Arc<dyn RemoteEntityStore<E>>) -> Self {
        Self { remote }
    }

    pub async fn sync_change(&self, operation: OperationKind, entity_id: &str, entity: &E) -> SyncOutcome {
        let result = match operation {
            OperationKind::Create => self
                .remote
                .create(entity)
                .await
                .map(|canonical| (canonical.id() != entity.id()).then(|| canonical.id().to_string())),
            OperationKind::Update => self.remote.update(entity).await.map(|_| None),
            OperationKind::Delete => match self.remote.delete(entity_id).await {
                // Already gone, possibly by an earlier attempt whose response was lost
                Err(RemoteError::NotFound(_)) => Ok(None),
                other => other.map(|_| None),
            },
        };
        SyncOutcome::from_result(result)
    }
}

/// The four adapters, dispatched on the payload tag
#[derive(Clone)]
pub struct SyncAdapters {
    tasks: EntityAdapter<Task>,
    projects: EntityAdapter<Project>,
    time_trackings: EntityAdapter<TimeTracking>,
    time_blocks: EntityAdapter<TimeBlock>,
}

impl SyncAdapters {
    /// Build every adapter on top of one remote store
    pub fn from_remote<R: RemoteStore>(remote: Arc<R>) -> Self {
        Self {
            tasks: EntityAdapter::new(remote.clone()),
            projects: EntityAdapter::new(remote.clone()),
            time_trackings: EntityAdapter::new(remote.clone()),
            time_blocks: EntityAdapter::new(remote),
        }
    }

    pub async fn sync_change(&self, op: &PendingOperation) -> SyncOutcome {
        let entity_id = op.entity_id.as_str();
        match &op.data {
            EntityPayload::Task(task) => self.tasks.sync_change(op.operation, entity_id, task).await,
            EntityPayload::Project(project) => self.projects.sync_change(op.operation, entity_id, project).await,
            EntityPayload::TimeTracking(tracking) => {
                self.time_trackings.sync_change(op.operation, entity_id, tracking).await
            }
            EntityPayload::TimeBlock(block) => self.time_blocks.sync_change(op.operation, entity_id, block).await,
        }
    }
}

impl std::fmt::Debug for SyncAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapters").finish_non_exhaustive()
    }
}

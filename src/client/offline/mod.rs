//! # Offline Mutations
//!
//! Provides offline-first mutation of projects, tasks, time trackings and
//! time blocks with optimistic local effects, a durable operation log and
//! automatic delivery when connectivity allows.
//!
//! ## Architecture
//!
//! The offline system consists of:
//! - **Optimistic Writes**: cache effect and log append in one local transaction
//! - **Pending Operation Log**: ordered view of the queued mutations
//! - **Retry Logic**: bounded delivery attempts with exponential backoff
//! - **Reconciliation**: remapping of server-assigned ids after a create
//!
//! ## Key Components
//!
//! - `optimistic.rs`: Phase 1 writes
//! - `queue.rs`: Pending operation log
//! - `retry.rs`: Retry policy and engine
//! - `reconciliation.rs`: Id remapping
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasksync::client::context::SyncContext;
//! use tasksync::shared::{SyncConfig, Task};
//!
//! # async fn example() -> Result<(), tasksync::shared::SyncError> {
//! let context = SyncContext::open(SyncConfig::default()).await?;
//! let offline = context.offline();
//!
//! let mut task = Task::new("Buy milk");
//! offline.create(task.clone()).await?;
//!
//! task.rename("Buy bread");
//! offline.update(task.clone()).await?;
//!
//! println!("{} change(s) waiting", offline.pending_count());
//! # Ok(())
//! # }
//! ```

pub mod optimistic;
pub mod queue;
pub mod reconciliation;
pub mod retry;

pub use optimistic::OptimisticWriter;
pub use queue::PendingOperationLog;
pub use reconciliation::{reconcile_created_id, RemapReport};
pub use retry::{DeliveryOutcome, RetryEngine, RetryPolicy, Sleeper, TokioSleeper};

use crate::client::local_db::LocalDatabase;
use crate::client::sync::{ConnectivityMonitor, SyncStatusNotifier};
use crate::shared::entities::SyncEntity;
use crate::shared::error::SyncError;
use crate::shared::operation::{OperationKind, PendingOperation};
use std::sync::Arc;

/// Entry point for local mutations
///
/// Every mutation returns once the optimistic write is durable; delivery to
/// the remote store happens in the background.
#[derive(Debug, Clone)]
pub struct OfflineManager {
    db: Arc<LocalDatabase>,
    writer: OptimisticWriter,
    log: PendingOperationLog,
    notifier: Arc<SyncStatusNotifier>,
    monitor: Arc<ConnectivityMonitor>,
}

impl OfflineManager {
    pub fn new(db: Arc<LocalDatabase>, notifier: Arc<SyncStatusNotifier>, monitor: Arc<ConnectivityMonitor>) -> Self {
        Self {
            writer: OptimisticWriter::new(db.clone()),
            log: PendingOperationLog::new(db.clone()),
            db,
            notifier,
            monitor,
        }
    }

    pub async fn create<E: SyncEntity>(&self, entity: E) -> Result<PendingOperation, SyncError> {
        self.mutate(OperationKind::Create, entity).await
    }

    pub async fn update<E: SyncEntity>(&self, entity: E) -> Result<PendingOperation, SyncError> {
        self.mutate(OperationKind::Update, entity).await
    }

    /// Delete a cached entity. Returns `None` if nothing is cached under `id`.
    pub async fn delete<E: SyncEntity>(&self, id: &str) -> Result<Option<PendingOperation>, SyncError> {
        let Some(entity) = self.db.get::<E>(id).await? else {
            tracing::debug!(entity_type = %E::ENTITY_TYPE, entity_id = id, "Nothing cached to delete");
            return Ok(None);
        };
        self.mutate(OperationKind::Delete, entity).await.map(Some)
    }

    async fn mutate<E: SyncEntity>(&self, kind: OperationKind, entity: E) -> Result<PendingOperation, SyncError> {
        let op = self.writer.apply(kind, entity.into_payload()).await?;
        self.notifier.refresh(&self.db).await?;
        self.monitor.request_sync().await;
        Ok(op)
    }

    pub async fn get<E: SyncEntity>(&self, id: &str) -> Result<Option<E>, SyncError> {
        Ok(self.db.get(id).await?)
    }

    pub async fn get_all<E: SyncEntity>(&self) -> Result<Vec<E>, SyncError> {
        Ok(self.db.get_all().await?)
    }

    /// Ordered view of the queued mutations
    pub fn log(&self) -> &PendingOperationLog {
        &self.log
    }

    /// Last published pending count
    pub fn pending_count(&self) -> usize {
        self.notifier.pending_count()
    }
}

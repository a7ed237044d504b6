//! # Sync Service
//!
//! Phase 2 of the offline-first flow: delivers queued local mutations to the
//! remote entity store.
//!
//! ## Architecture
//!
//! The sync service coordinates multiple components:
//! - **Adapters**: one per entity type, mapping an operation to a remote call
//! - **Retry Engine**: bounded, exponentially spaced delivery attempts
//! - **Scheduler**: follow-up passes while deliverable operations remain
//! - **Network Monitor**: connectivity status gating every pass
//! - **Connectivity Monitor**: reconnect, interval and background-sync triggers
//! - **Notifier**: pending-count updates for UI collaborators
//! - **Sync State / Metrics**: status snapshot and pass counters
//!
//! ## Key Features
//!
//! - **Single-Flight**: overlapping `sync_all` calls return an empty summary
//! - **Ordered Delivery**: operations are attempted oldest first, never coalesced
//! - **Exactly-Once Removal**: an operation leaves the log only after confirmed delivery
//! - **Manual Resolution**: exhausted or rejected operations stay queued and flagged
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasksync::client::context::SyncContext;
//! use tasksync::shared::SyncConfig;
//!
//! # async fn example() -> Result<(), tasksync::shared::SyncError> {
//! let context = SyncContext::open(SyncConfig::default()).await?;
//! let summary = context.service().sync_all().await?;
//! println!("delivered {}, failed {}", summary.success, summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod background;
pub mod connectivity;
pub mod metrics;
pub mod network_monitor;
pub mod notifier;
pub mod scheduler;
pub mod sync_state;

pub use adapters::{EntityAdapter, SyncAdapters, SyncOutcome};
pub use background::{BackgroundSync, BackgroundSyncRegistration, ChannelBackgroundSync, NoBackgroundSync};
pub use connectivity::ConnectivityMonitor;
pub use metrics::SyncMetrics;
pub use network_monitor::{NetworkMonitor, NetworkStatus};
pub use notifier::{ListenerHandle, SyncStatusNotifier};
pub use scheduler::FollowUpScheduler;
pub use sync_state::SyncState;

use crate::client::local_db::LocalDatabase;
use crate::client::offline::queue::PendingOperationLog;
use crate::client::offline::reconciliation::reconcile_created_id;
use crate::client::offline::retry::{DeliveryOutcome, RetryEngine, RetryPolicy, Sleeper};
use crate::shared::config::SyncConfig;
use crate::shared::error::{StorageError, SyncError};
use crate::shared::operation::{now_micros, OperationKind, PendingOperation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// How much of the log one pass works through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// At most `size` operations per pass; follow-up passes drain the rest
    Batched { size: usize },
    /// Every eligible operation in one pass
    FullDrain,
}

impl SyncMode {
    pub fn from_batch_size(batch_size: Option<usize>) -> Self {
        match batch_size {
            Some(size) => SyncMode::Batched { size: size.max(1) },
            None => SyncMode::FullDrain,
        }
    }

    fn limit(&self) -> usize {
        match self {
            SyncMode::Batched { size } => *size,
            SyncMode::FullDrain => usize::MAX,
        }
    }
}

/// Counts from one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Delivered and removed from the log
    pub success: usize,
    /// Exhausted or rejected; left in the log, flagged for manual resolution
    pub failed: usize,
    /// Not attempted because they await manual resolution
    pub skipped: usize,
}

impl SyncSummary {
    pub fn is_empty(&self) -> bool {
        self.success == 0 && self.failed == 0 && self.skipped == 0
    }
}

/// Clears the single-flight flag on drop
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Main sync service coordinator
#[derive(Debug)]
pub struct SyncService {
    db: Arc<LocalDatabase>,
    log: PendingOperationLog,
    engine: RetryEngine,
    adapters: SyncAdapters,
    notifier: Arc<SyncStatusNotifier>,
    network: Arc<NetworkMonitor>,
    scheduler: FollowUpScheduler,
    mode: SyncMode,
    syncing: AtomicBool,
    metrics: Mutex<SyncMetrics>,
    last_summary: Mutex<Option<SyncSummary>>,
}

impl SyncService {
    pub fn new(
        db: Arc<LocalDatabase>,
        adapters: SyncAdapters,
        notifier: Arc<SyncStatusNotifier>,
        network: Arc<NetworkMonitor>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            log: PendingOperationLog::new(db.clone()),
            engine: RetryEngine::new(db.clone(), RetryPolicy::from(&config.retry), network.clone()),
            scheduler: FollowUpScheduler::new(config.reschedule_delay()),
            mode: SyncMode::from_batch_size(config.batch_size),
            db,
            adapters,
            notifier,
            network,
            syncing: AtomicBool::new(false),
            metrics: Mutex::new(SyncMetrics::new()),
            last_summary: Mutex::new(None),
        }
    }

    /// Replace the backoff sleeper, keeping the retry policy
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        let policy = self.engine.policy().clone();
        self.engine = RetryEngine::with_sleeper(self.db.clone(), policy, self.network.clone(), sleeper);
        self
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }

    pub fn notifier(&self) -> &Arc<SyncStatusNotifier> {
        &self.notifier
    }

    pub fn scheduler(&self) -> &FollowUpScheduler {
        &self.scheduler
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    fn metrics_mut(&self) -> MutexGuard<'_, SyncMetrics> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn metrics(&self) -> SyncMetrics {
        self.metrics_mut().clone()
    }

    pub fn last_summary(&self) -> Option<SyncSummary> {
        *self.last_summary.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one sync pass over the pending operation log.
    ///
    /// Returns an empty summary without touching the log when offline or when
    /// another pass is already running. After the pass the pending count is
    /// republished, and a follow-up pass is scheduled if deliverable
    /// operations remain while online.
    pub async fn sync_all(self: &Arc<Self>) -> Result<SyncSummary, SyncError> {
        if !self.network.is_online() {
            tracing::debug!("Offline, skipping sync pass");
            return Ok(SyncSummary::default());
        }
        let Some(_guard) = PassGuard::acquire(&self.syncing) else {
            tracing::debug!("Sync pass already running");
            return Ok(SyncSummary::default());
        };

        self.metrics_mut().record_pass_start();
        let summary = match self.run_pass().await {
            Ok(summary) => summary,
            Err(e) => {
                self.metrics_mut().record_pass_failure();
                tracing::error!(error = %e, "Sync pass aborted");
                if let Err(refresh) = self.notifier.refresh(&self.db).await {
                    tracing::warn!(error = %refresh, "Could not refresh pending count");
                }
                return Err(e.into());
            }
        };
        self.metrics_mut().record_pass_complete(&summary);
        *self.last_summary.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(summary);

        let pending = self.notifier.refresh(&self.db).await?;
        tracing::info!(
            success = summary.success,
            failed = summary.failed,
            skipped = summary.skipped,
            pending,
            "Sync pass finished"
        );

        let remaining = self.log.eligible().await?.len();
        if remaining > 0 && self.network.is_online() {
            self.scheduler.schedule(Arc::clone(self));
        }

        Ok(summary)
    }

    async fn run_pass(&self) -> Result<SyncSummary, StorageError> {
        let (eligible, stalled): (Vec<PendingOperation>, Vec<PendingOperation>) =
            self.log.ordered().await?.into_iter().partition(|op| !op.requires_resolution);

        let mut summary = SyncSummary {
            skipped: stalled.len(),
            ..SyncSummary::default()
        };

        for queued in eligible.into_iter().take(self.mode.limit()) {
            if !self.network.is_online() {
                tracing::info!("Went offline mid-pass, stopping");
                break;
            }

            // Earlier deliveries in this pass may have remapped or removed it
            let Some(mut op) = self.db.get_pending_operation(queued.id).await? else {
                continue;
            };

            match self.engine.process_operation(&mut op, &self.adapters).await? {
                DeliveryOutcome::Delivered { canonical_id } => {
                    match canonical_id.filter(|_| op.operation == OperationKind::Create) {
                        Some(canonical_id) => {
                            reconcile_created_id(&self.db, op.id, op.entity_type(), &op.entity_id, &canonical_id)
                                .await?;
                        }
                        None => self.db.delete_pending_operation(op.id).await?,
                    }
                    self.db.set_last_sync_time(op.entity_type(), now_micros()).await?;
                    summary.success += 1;
                }
                DeliveryOutcome::Exhausted { .. } | DeliveryOutcome::Rejected { .. } => summary.failed += 1,
                DeliveryOutcome::Skipped => summary.skipped += 1,
                DeliveryOutcome::Deferred => {
                    tracing::info!("Went offline during backoff, stopping");
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Current engine status
    pub async fn state(&self) -> Result<SyncState, SyncError> {
        let mut last_sync = None;
        for entity_type in crate::shared::operation::EntityType::ALL {
            last_sync = last_sync.max(self.db.last_sync_time(entity_type).await?);
        }

        Ok(SyncState {
            is_syncing: self.is_syncing(),
            network_status: self.network.status(),
            last_sync,
            pending_operations: self.db.count_pending_operations().await?,
            stalled_operations: self.db.count_stalled_operations().await?,
            last_summary: self.last_summary(),
        })
    }

    /// Operations waiting for manual resolution, oldest first
    pub async fn stalled_operations(&self) -> Result<Vec<PendingOperation>, SyncError> {
        Ok(self.log.stalled().await?)
    }

    /// Give every stalled operation a fresh attempt budget and run a pass
    pub async fn retry_stalled(self: &Arc<Self>) -> Result<SyncSummary, SyncError> {
        let stalled = self.log.stalled().await?;
        for mut op in stalled {
            op.attempts = 0;
            op.last_attempt = None;
            op.requires_resolution = false;
            self.db.update_pending_operation(&op).await?;
            tracing::info!(op_id = %op.id, entity_type = %op.entity_type(), "Operation released for retry");
        }
        self.sync_all().await
    }

    /// Drop a queued operation without delivering it.
    ///
    /// The optimistic cache write stays in place. Returns `false` if the
    /// operation no longer exists.
    pub async fn discard_operation(&self, id: Uuid) -> Result<bool, SyncError> {
        let Some(op) = self.db.get_pending_operation(id).await? else {
            return Ok(false);
        };
        if self.engine.is_in_flight(id) {
            tracing::warn!(op_id = %id, "Refusing to discard an operation being delivered");
            return Ok(false);
        }

        self.db.delete_pending_operation(id).await?;
        tracing::warn!(
            op_id = %id,
            entity_type = %op.entity_type(),
            entity_id = %op.entity_id,
            operation = %op.operation,
            "Pending operation discarded"
        );
        self.notifier.refresh(&self.db).await?;
        Ok(true)
    }
}

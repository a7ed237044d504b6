//! # Connectivity Monitor
//!
//! Turns connectivity signals and timers into sync passes:
//!
//! - Offline -> Online fires an immediate pass
//! - Online -> Offline only republishes status; passes are no-ops while offline
//! - while online, a periodic tick fires a pass as a safety net
//!
//! Mutations ask for a sync through [`ConnectivityMonitor::request_sync`],
//! which prefers the platform background-sync capability and falls back to a
//! foreground pass.

use crate::client::local_db::LocalDatabase;
use crate::client::sync::background::{BackgroundSync, BackgroundSyncRegistration, SYNC_TAG};
use crate::client::sync::network_monitor::{NetworkMonitor, NetworkStatus};
use crate::client::sync::notifier::SyncStatusNotifier;
use crate::client::sync::{SyncService, SyncSummary};
use crate::shared::error::SyncError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug)]
pub struct ConnectivityMonitor {
    service: Arc<SyncService>,
    network: Arc<NetworkMonitor>,
    notifier: Arc<SyncStatusNotifier>,
    db: Arc<LocalDatabase>,
    background: Arc<dyn BackgroundSync>,
    interval: Duration,
    auto_sync: bool,
}

impl ConnectivityMonitor {
    pub fn new(
        service: Arc<SyncService>,
        db: Arc<LocalDatabase>,
        background: Arc<dyn BackgroundSync>,
        interval: Duration,
        auto_sync: bool,
    ) -> Self {
        Self {
            network: service.network().clone(),
            notifier: service.notifier().clone(),
            service,
            db,
            background,
            interval: interval.max(Duration::from_millis(1)),
            auto_sync,
        }
    }

    /// Run the monitor loop on the current runtime.
    ///
    /// Transitions are observed from the moment this returns.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let status_rx = self.network.subscribe();
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run_with(status_rx).await })
    }

    /// React to transitions and ticks until the network monitor is dropped
    pub async fn run(&self) {
        self.run_with(self.network.subscribe()).await
    }

    async fn run_with(&self, mut status_rx: watch::Receiver<NetworkStatus>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval_secs = self.interval.as_secs(), auto_sync = self.auto_sync, "Connectivity monitor started");
        loop {
            tokio::select! {
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = *status_rx.borrow_and_update();
                    self.on_status_change(status).await;
                }
                _ = ticker.tick() => {
                    if self.auto_sync && self.network.is_online() {
                        self.trigger("interval").await;
                    }
                }
            }
        }
        tracing::info!("Connectivity monitor stopped");
    }

    async fn on_status_change(&self, status: NetworkStatus) {
        if let Err(e) = self.notifier.refresh(&self.db).await {
            tracing::warn!(error = %e, "Could not refresh pending count");
        }
        if status.is_online() && self.auto_sync {
            self.trigger("reconnect").await;
        }
    }

    async fn trigger(&self, reason: &'static str) {
        match self.service.sync_all().await {
            Ok(summary) if !summary.is_empty() => {
                tracing::debug!(reason, success = summary.success, failed = summary.failed, "Triggered sync pass");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(reason, error = %e, "Triggered sync pass failed"),
        }
    }

    /// Ask for a sync soon after a local mutation.
    ///
    /// Returns without waiting for delivery. Does nothing while offline; the
    /// reconnect transition covers that case.
    pub async fn request_sync(&self) {
        if !self.network.is_online() {
            return;
        }

        match self.background.register(SYNC_TAG).await {
            Ok(BackgroundSyncRegistration::Registered) => {
                tracing::debug!(tag = SYNC_TAG, "Background sync registered");
                return;
            }
            Ok(BackgroundSyncRegistration::Unsupported) => {}
            Err(e) => tracing::warn!(error = %e, "Falling back to foreground sync"),
        }

        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            if let Err(e) = service.sync_all().await {
                tracing::error!(error = %e, "Foreground sync pass failed");
            }
        });
    }

    /// Entry point for platform background-sync events.
    ///
    /// Unknown tags are ignored and yield `None`.
    pub async fn handle_background_sync_event(&self, tag: &str) -> Result<Option<SyncSummary>, SyncError> {
        if tag != SYNC_TAG {
            return Ok(None);
        }
        Ok(Some(self.service.sync_all().await?))
    }
}

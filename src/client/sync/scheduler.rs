//! # Follow-Up Scheduler
//!
//! Schedules the self-perpetuating drain: when a pass ends with deliverable
//! operations left and the network is up, another pass runs after a fixed
//! delay. At most one follow-up is armed at any time.

use crate::client::sync::SyncService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct FollowUpScheduler {
    delay: Duration,
    armed: Arc<AtomicBool>,
}

impl FollowUpScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a follow-up pass is waiting to run
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Run `service.sync_all()` after the delay unless a follow-up is already armed.
    ///
    /// Returns `true` if this call armed a new follow-up.
    pub(crate) fn schedule(&self, service: Arc<SyncService>) -> bool {
        if self.armed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let armed = Arc::clone(&self.armed);
        let delay = self.delay;
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Scheduling follow-up sync pass");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Disarm first so the pass below can schedule its own follow-up
            armed.store(false, Ordering::SeqCst);
            if let Err(e) = service.sync_all().await {
                tracing::error!(error = %e, "Follow-up sync pass failed");
            }
        });
        true
    }
}

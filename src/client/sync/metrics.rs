//! # Sync Metrics
//!
//! In-process counters for sync passes and operation deliveries.
//!
//! ## Features
//!
//! - **Pass Metrics**: started, completed and failed passes, rolling average duration
//! - **Delivery Counters**: delivered, failed and skipped operations

use crate::client::sync::SyncSummary;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct SyncMetrics {
    pub total_passes: u64,
    pub completed_passes: u64,
    pub failed_passes: u64,
    pub operations_delivered: u64,
    pub operations_failed: u64,
    pub operations_skipped: u64,
    pub average_pass_duration: Duration,
    pub last_pass_duration: Option<Duration>,
    last_pass_start: Option<Instant>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass_start(&mut self) {
        self.last_pass_start = Some(Instant::now());
        self.total_passes += 1;
    }

    pub fn record_pass_complete(&mut self, summary: &SyncSummary) {
        self.operations_delivered += summary.success as u64;
        self.operations_failed += summary.failed as u64;
        self.operations_skipped += summary.skipped as u64;

        if let Some(start) = self.last_pass_start.take() {
            let duration = start.elapsed();
            self.last_pass_duration = Some(duration);
            self.completed_passes += 1;

            // Update rolling average
            let completed = u32::try_from(self.completed_passes).unwrap_or(u32::MAX);
            let total = self.average_pass_duration * (completed - 1) + duration;
            self.average_pass_duration = total / completed;
        }
    }

    /// A pass aborted on a storage error
    pub fn record_pass_failure(&mut self) {
        self.last_pass_start = None;
        self.failed_passes += 1;
    }

    /// Share of attempted operations that were delivered
    pub fn delivery_rate(&self) -> f64 {
        let attempted = self.operations_delivered + self.operations_failed;
        if attempted == 0 {
            0.0
        } else {
            self.operations_delivered as f64 / attempted as f64
        }
    }
}

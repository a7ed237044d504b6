//! # Sync State
//!
//! Point-in-time snapshot of the sync engine for status displays.

use crate::client::sync::network_monitor::NetworkStatus;
use crate::client::sync::SyncSummary;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub is_syncing: bool,
    pub network_status: NetworkStatus,
    /// Most recent successful delivery, any collection
    pub last_sync: Option<DateTime<Utc>>,
    /// Pending operations, stalled ones included
    pub pending_operations: usize,
    /// Operations waiting for manual resolution
    pub stalled_operations: usize,
    pub last_summary: Option<SyncSummary>,
}

impl SyncState {
    /// Whether everything local has reached the remote store
    pub fn is_settled(&self) -> bool {
        self.pending_operations == 0
    }

    pub fn needs_attention(&self) -> bool {
        self.stalled_operations > 0
    }
}

//! # Background Sync Capability
//!
//! Optional platform hook that defers a sync until the host decides to run
//! it (e.g. an OS job scheduler). Registration is best-effort: when the
//! capability is missing or refuses the request, callers fall back to an
//! immediate foreground pass.
//!
//! ## Implementations
//!
//! - [`NoBackgroundSync`]: the capability is absent
//! - [`ChannelBackgroundSync`]: registrations are forwarded over a channel to
//!   whichever loop owns the deferred work

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Tag used when registering pending-operation syncs
pub const SYNC_TAG: &str = "sync-pending-operations";

/// Result of a registration request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundSyncRegistration {
    /// The platform will fire a sync event for the tag later
    Registered,
    /// No background sync on this platform
    Unsupported,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackgroundSyncError {
    #[error("Background sync registration failed: {0}")]
    Registration(String),
}

/// Platform background-sync registration
#[async_trait]
pub trait BackgroundSync: Send + Sync + std::fmt::Debug {
    async fn register(&self, tag: &str) -> Result<BackgroundSyncRegistration, BackgroundSyncError>;
}

/// Background sync is not available
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBackgroundSync;

#[async_trait]
impl BackgroundSync for NoBackgroundSync {
    async fn register(&self, _tag: &str) -> Result<BackgroundSyncRegistration, BackgroundSyncError> {
        Ok(BackgroundSyncRegistration::Unsupported)
    }
}

/// Forwards registered tags to a receiver
#[derive(Debug, Clone)]
pub struct ChannelBackgroundSync {
    events: mpsc::UnboundedSender<String>,
}

impl ChannelBackgroundSync {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }
}

#[async_trait]
impl BackgroundSync for ChannelBackgroundSync {
    async fn register(&self, tag: &str) -> Result<BackgroundSyncRegistration, BackgroundSyncError> {
        self.events
            .send(tag.to_string())
            .map_err(|_| BackgroundSyncError::Registration("event receiver dropped".to_string()))?;
        Ok(BackgroundSyncRegistration::Registered)
    }
}

//! # Sync Status Notifier
//!
//! Publishes the current pending-operation count to UI collaborators. Two
//! surfaces are offered: plain callbacks registered with [`add_listener`] and
//! an async [`watch`] receiver.
//!
//! The count is refreshed from the local database after every enqueue, after
//! every sync pass and on connectivity changes.
//!
//! [`add_listener`]: SyncStatusNotifier::add_listener
//! [`watch`]: SyncStatusNotifier::watch

use crate::client::local_db::LocalDatabase;
use crate::shared::error::StorageError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

type Listener = Arc<dyn Fn(usize) + Send + Sync>;

/// Publish/subscribe surface for the pending-operation count
pub struct SyncStatusNotifier {
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    count: watch::Sender<usize>,
}

impl std::fmt::Debug for SyncStatusNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStatusNotifier")
            .field("pending_count", &self.pending_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for SyncStatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatusNotifier {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            listeners: Mutex::new(BTreeMap::new()),
            next_listener_id: AtomicU64::new(0),
            count,
        }
    }

    fn listeners(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, Listener>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `listener`; it is called with the count whenever it may have changed.
    ///
    /// Dropping the returned handle keeps the listener registered; call
    /// [`ListenerHandle::unsubscribe`] to remove it.
    pub fn add_listener<F>(self: &Arc<Self>, listener: F) -> ListenerHandle
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners().insert(id, Arc::new(listener));
        ListenerHandle {
            notifier: Arc::downgrade(self),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Last published pending count
    pub fn pending_count(&self) -> usize {
        *self.count.borrow()
    }

    /// Async view of the pending count
    pub fn watch(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    /// Publish `count` to every listener
    pub fn publish(&self, count: usize) {
        self.count.send_replace(count);

        // Call outside the lock so listeners may (un)subscribe
        let listeners: Vec<Listener> = self.listeners().values().cloned().collect();
        for listener in listeners {
            listener(count);
        }
    }

    /// Re-read the pending count from `db` and publish it
    pub async fn refresh(&self, db: &LocalDatabase) -> Result<usize, StorageError> {
        let count = db.count_pending_operations().await?;
        tracing::trace!(pending = count, "Publishing pending count");
        self.publish(count);
        Ok(count)
    }
}

/// Registration returned by [`SyncStatusNotifier::add_listener`]
#[derive(Debug)]
pub struct ListenerHandle {
    notifier: Weak<SyncStatusNotifier>,
    id: u64,
}

impl ListenerHandle {
    /// Remove the listener. A no-op if the notifier is gone.
    pub fn unsubscribe(self) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.listeners().remove(&self.id);
        }
    }
}

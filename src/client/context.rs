//! # Sync Context
//!
//! The single service object an application constructs at startup. It owns
//! the local database, the notifier, the network monitor, the sync service,
//! the connectivity monitor and the offline mutation entry point, and hands
//! out shared references to them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasksync::client::context::SyncContext;
//! use tasksync::client::local_db::LocalDatabase;
//! use tasksync::client::remote::InMemoryRemoteStore;
//! use tasksync::shared::SyncConfig;
//!
//! # async fn example() -> Result<(), tasksync::shared::SyncError> {
//! let context = SyncContext::builder(SyncConfig::default())
//!     .database(LocalDatabase::open_in_memory().await?)
//!     .remote(Arc::new(InMemoryRemoteStore::new()))
//!     .build()
//!     .await?;
//!
//! let _subscription = context.notifier().add_listener(|pending| println!("{pending} pending"));
//! let monitor = context.monitor().spawn();
//! # monitor.abort();
//! # Ok(())
//! # }
//! ```

use crate::client::local_db::LocalDatabase;
use crate::client::offline::{OfflineManager, Sleeper};
use crate::client::remote::{HttpRemoteStore, RemoteStore};
use crate::client::sync::{
    BackgroundSync, ConnectivityMonitor, NetworkMonitor, NetworkStatus, NoBackgroundSync, SyncAdapters,
    SyncService, SyncStatusNotifier,
};
use crate::shared::config::SyncConfig;
use crate::shared::error::SyncError;
use std::sync::Arc;

/// Wiring of every sync component
#[derive(Debug, Clone)]
pub struct SyncContext {
    config: Arc<SyncConfig>,
    db: Arc<LocalDatabase>,
    notifier: Arc<SyncStatusNotifier>,
    network: Arc<NetworkMonitor>,
    service: Arc<SyncService>,
    monitor: Arc<ConnectivityMonitor>,
    offline: OfflineManager,
}

impl SyncContext {
    /// Open the configured database file and talk to the configured HTTP server
    pub async fn open(config: SyncConfig) -> Result<Self, SyncError> {
        let db = LocalDatabase::open(config.database_path()).await?;
        let remote = Arc::new(HttpRemoteStore::new(config.clone())?);
        Self::builder(config).database(db).remote(remote).build().await
    }

    pub fn builder(config: SyncConfig) -> SyncContextBuilder {
        SyncContextBuilder {
            config,
            db: None,
            adapters: None,
            background: None,
            sleeper: None,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn db(&self) -> &Arc<LocalDatabase> {
        &self.db
    }

    pub fn notifier(&self) -> &Arc<SyncStatusNotifier> {
        &self.notifier
    }

    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }

    pub fn service(&self) -> &Arc<SyncService> {
        &self.service
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn offline(&self) -> &OfflineManager {
        &self.offline
    }

    /// Feed a connectivity signal from the host platform
    pub fn set_online(&self, online: bool) -> bool {
        self.network.set_online(online)
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

/// Builder for [`SyncContext`]
pub struct SyncContextBuilder {
    config: SyncConfig,
    db: Option<LocalDatabase>,
    adapters: Option<SyncAdapters>,
    background: Option<Arc<dyn BackgroundSync>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl SyncContextBuilder {
    /// Use an already opened database instead of the configured path
    pub fn database(mut self, db: LocalDatabase) -> Self {
        self.db = Some(db);
        self
    }

    /// Deliver to `remote` instead of the configured HTTP server
    pub fn remote<R: RemoteStore>(mut self, remote: Arc<R>) -> Self {
        self.adapters = Some(SyncAdapters::from_remote(remote));
        self
    }

    pub fn background(mut self, background: Arc<dyn BackgroundSync>) -> Self {
        self.background = Some(background);
        self
    }

    /// Replace the backoff sleeper
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub async fn build(self) -> Result<SyncContext, SyncError> {
        let config = self.config;
        config.validate()?;

        let db = match self.db {
            Some(db) => db,
            None => LocalDatabase::open(config.database_path()).await?,
        };
        let db = Arc::new(db);
        let adapters = match self.adapters {
            Some(adapters) => adapters,
            None => SyncAdapters::from_remote(Arc::new(HttpRemoteStore::new(config.clone())?)),
        };

        let initial = if config.start_offline {
            NetworkStatus::Offline
        } else {
            NetworkStatus::Online
        };
        let network = Arc::new(NetworkMonitor::new(initial));
        let notifier = Arc::new(SyncStatusNotifier::new());

        let mut service = SyncService::new(db.clone(), adapters, notifier.clone(), network.clone(), &config);
        if let Some(sleeper) = self.sleeper {
            service = service.with_sleeper(sleeper);
        }
        let service = Arc::new(service);

        let background = self.background.unwrap_or_else(|| Arc::new(NoBackgroundSync));
        let monitor = Arc::new(ConnectivityMonitor::new(
            service.clone(),
            db.clone(),
            background,
            config.sync_interval(),
            config.auto_sync,
        ));
        let offline = OfflineManager::new(db.clone(), notifier.clone(), monitor.clone());

        let pending = notifier.refresh(&db).await?;
        tracing::info!(pending, online = network.is_online(), mode = ?service.mode(), "Sync context ready");

        Ok(SyncContext {
            config: Arc::new(config),
            db,
            notifier,
            network,
            service,
            monitor,
            offline,
        })
    }
}

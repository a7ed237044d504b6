//! Sync context fixtures
//!
//! Builds a fully wired `SyncContext` over an in-memory database (or a file
//! in a temporary directory) and an `InMemoryRemoteStore`.

use crate::common::RecordingSleeper;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tasksync::client::local_db::LocalDatabase;
use tasksync::client::remote::InMemoryRemoteStore;
use tasksync::client::SyncContext;
use tasksync::shared::{SyncConfig, SyncConfigBuilder};

/// A wired context plus handles on its test doubles
pub struct TestEnv {
    pub context: SyncContext,
    pub remote: Arc<InMemoryRemoteStore>,
    pub sleeper: Arc<RecordingSleeper>,
}

/// Config used by most tests: starts offline, drains fully, no follow-up delay
pub fn test_config() -> SyncConfigBuilder {
    SyncConfig::builder()
        .start_offline(true)
        .batch_size(None)
        .reschedule_delay_secs(0)
}

pub async fn env_with(config: SyncConfig, db: LocalDatabase, remote: InMemoryRemoteStore) -> TestEnv {
    let remote = Arc::new(remote);
    let sleeper = Arc::new(RecordingSleeper::default());
    let context = SyncContext::builder(config)
        .database(db)
        .remote(remote.clone())
        .sleeper(sleeper.clone())
        .build()
        .await
        .expect("Failed to build sync context");
    TestEnv {
        context,
        remote,
        sleeper,
    }
}

/// Offline context over an in-memory database
pub async fn offline_env() -> TestEnv {
    let db = LocalDatabase::open_in_memory().await.expect("Failed to open database");
    env_with(test_config().build().unwrap(), db, InMemoryRemoteStore::new()).await
}

/// Offline context over a database file
pub async fn file_env(path: &Path) -> TestEnv {
    let db = LocalDatabase::open(path).await.expect("Failed to open database file");
    env_with(test_config().build().unwrap(), db, InMemoryRemoteStore::new()).await
}

/// Wait until the published pending count equals `expected`
pub async fn wait_for_pending(context: &SyncContext, expected: usize) {
    let mut rx = context.notifier().watch();
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|count| *count == expected))
        .await
        .unwrap_or_else(|_| panic!("pending count never reached {expected}"))
        .expect("notifier dropped");
}

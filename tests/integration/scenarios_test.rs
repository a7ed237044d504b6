//! End-to-end offline scenarios

use crate::common::*;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tasksync::client::local_db::LocalDatabase;
use tasksync::client::offline::{DeliveryOutcome, RetryEngine, RetryPolicy};
use tasksync::client::remote::{InMemoryRemoteStore, RemoteEntityStore};
use tasksync::client::sync::{NetworkMonitor, NetworkStatus, SyncAdapters};
use tasksync::shared::{EntityPayload, EntityType, OperationKind, PendingOperation, RemoteError, Task};

#[tokio::test]
async fn test_offline_update_reaches_remote_after_reconnect() {
    let env = offline_env().await;
    let mut task = Task::new("Buy milk");
    RemoteEntityStore::<Task>::create(env.remote.as_ref(), &task).await.unwrap();
    env.context.db().put(&task).await.unwrap();
    let monitor = env.context.monitor().spawn();

    task.rename("Buy bread");
    env.context.offline().update(task.clone()).await.unwrap();

    let cached: Task = env.context.offline().get(&task.id).await.unwrap().unwrap();
    assert_eq!(cached.title, "Buy bread");
    assert_eq!(env.context.notifier().pending_count(), 1);

    env.context.set_online(true);
    wait_for_pending(&env.context, 0).await;

    assert_eq!(env.remote.get::<Task>(&task.id).unwrap().title, "Buy bread");
    monitor.abort();
}

#[tokio::test]
async fn test_create_then_delete_offline_nets_out() {
    let env = offline_env().await;
    let task = Task::new("Temporary");

    env.context.offline().create(task.clone()).await.unwrap();
    env.context.offline().delete::<Task>(&task.id).await.unwrap();

    let history = env.context.offline().log().for_entity(&task.id).await.unwrap();
    let kinds: Vec<OperationKind> = history.iter().map(|op| op.operation).collect();
    assert_eq!(kinds, vec![OperationKind::Create, OperationKind::Delete]);
    assert!(history[0].timestamp <= history[1].timestamp);

    env.context.set_online(true);
    let summary = env.context.service().sync_all().await.unwrap();

    assert_eq!(summary.success, 2);
    assert!(!env.remote.contains(EntityType::Task, &task.id));
    assert_eq!(env.remote.calls().len(), 2);
}

#[tokio::test]
async fn test_fifth_attempt_succeeds_after_full_backoff() {
    let db = Arc::new(LocalDatabase::open_in_memory().await.unwrap());
    let remote = Arc::new(InMemoryRemoteStore::new());
    let adapters = SyncAdapters::from_remote(remote.clone());
    let sleeper = Arc::new(RecordingSleeper::default());
    let network = Arc::new(NetworkMonitor::new(NetworkStatus::Online));
    let engine = RetryEngine::with_sleeper(db.clone(), RetryPolicy::default(), network, sleeper.clone());

    let mut op = PendingOperation::new(OperationKind::Create, EntityPayload::Task(Task::new("Flaky")));
    db.apply_and_enqueue(&op).await.unwrap();
    remote.fail_times(
        4,
        RemoteError::Server {
            status: 502,
            message: "bad gateway".into(),
        },
    );

    let outcome = engine.process_operation(&mut op, &adapters).await.unwrap();

    assert_matches!(outcome, DeliveryOutcome::Delivered { .. });
    let delays = sleeper.delays();
    assert_eq!(delays.len(), 4);
    for (delay, expected_ms) in delays.iter().zip([1000u64, 2000, 4000, 8000]) {
        let expected = Duration::from_millis(expected_ms);
        assert!(*delay >= expected.mul_f64(0.75) && *delay <= expected.mul_f64(1.25), "{delay:?}");
    }
    let total = sleeper.total();
    assert!(total >= Duration::from_millis(11_250) && total <= Duration::from_millis(18_750));
}

#[tokio::test]
async fn test_exhausted_operation_stays_queued() {
    let env = offline_env().await;
    let task = Task::new("Never delivered");
    let op = env.context.offline().create(task.clone()).await.unwrap();
    env.remote.fail_times(5, RemoteError::Network("connection refused".into()));

    env.context.set_online(true);
    let summary = env.context.service().sync_all().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.success, 0);
    let stored = env.context.db().get_pending_operation(op.id).await.unwrap().unwrap();
    assert_eq!(stored.attempts, 5);
    assert!(stored.requires_resolution);
    assert_eq!(env.context.notifier().pending_count(), 1);
    assert_eq!(env.sleeper.delays().len(), 4);
}

#[tokio::test]
async fn test_single_failed_call_increments_attempts_once() {
    let config = test_config()
        .retry(tasksync::shared::RetrySettings {
            max_attempts: 1,
            ..Default::default()
        })
        .build()
        .unwrap();
    let db = LocalDatabase::open_in_memory().await.unwrap();
    let env = env_with(config, db, InMemoryRemoteStore::new()).await;
    let op = env.context.offline().create(Task::new("Once")).await.unwrap();
    env.remote.fail_next(RemoteError::Timeout);

    env.context.set_online(true);
    env.context.service().sync_all().await.unwrap();

    let stored = env.context.db().get_pending_operation(op.id).await.unwrap().unwrap();
    assert_eq!(stored.attempts, op.attempts + 1);
}

#[tokio::test]
async fn test_successful_delivery_removes_exactly_once() {
    let env = offline_env().await;
    let op = env.context.offline().create(Task::new("Once only")).await.unwrap();

    env.context.set_online(true);
    let first = env.context.service().sync_all().await.unwrap();
    let second = env.context.service().sync_all().await.unwrap();

    assert_eq!(first.success, 1);
    assert!(second.is_empty());
    assert!(env.context.db().get_pending_operation(op.id).await.unwrap().is_none());
    assert_eq!(env.remote.calls().len(), 1);
}

#[tokio::test]
async fn test_rejected_change_can_be_retried_manually() {
    let env = offline_env().await;
    env.context.offline().create(Task::new("Needs a fix")).await.unwrap();
    env.remote.fail_next(RemoteError::Validation("due date in the past".into()));

    env.context.set_online(true);
    assert_eq!(env.context.service().sync_all().await.unwrap().failed, 1);
    assert_eq!(env.context.service().stalled_operations().await.unwrap().len(), 1);

    let summary = env.context.service().retry_stalled().await.unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(env.context.notifier().pending_count(), 0);
}

//! Single-flight sync passes

use crate::common::*;
use std::time::Duration;
use tasksync::client::local_db::LocalDatabase;
use tasksync::client::remote::InMemoryRemoteStore;
use tasksync::shared::Task;

#[tokio::test]
async fn test_overlapping_passes_run_once() {
    let db = LocalDatabase::open_in_memory().await.unwrap();
    let remote = InMemoryRemoteStore::new().with_latency(Duration::from_millis(100));
    let env = env_with(test_config().build().unwrap(), db, remote).await;
    env.context.offline().create(Task::new("Only once")).await.unwrap();
    env.context.set_online(true);

    let service = env.context.service();
    let (first, second) = tokio::join!(service.sync_all(), service.sync_all());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.success + second.success, 1);
    assert!(first.is_empty() || second.is_empty());
    assert_eq!(env.remote.calls().len(), 1);
    assert!(!service.is_syncing());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_callers_never_double_deliver() {
    let db = LocalDatabase::open_in_memory().await.unwrap();
    let remote = InMemoryRemoteStore::new().with_latency(Duration::from_millis(20));
    let env = env_with(test_config().build().unwrap(), db, remote).await;
    for n in 0..5 {
        env.context.offline().create(Task::new(format!("Task {n}"))).await.unwrap();
    }
    env.context.set_online(true);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = env.context.service().clone();
        handles.push(tokio::spawn(async move { service.sync_all().await.unwrap() }));
    }
    let mut delivered = 0;
    for handle in handles {
        delivered += handle.await.unwrap().success;
    }

    wait_for_pending(&env.context, 0).await;
    assert_eq!(delivered, 5);
    assert_eq!(env.context.service().metrics().operations_delivered, 5);
    assert_eq!(env.remote.calls().len(), 5);
}

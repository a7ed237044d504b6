//! Delivery order guarantees

use crate::common::*;
use pretty_assertions::assert_eq;
use tasksync::client::remote::RemoteCall;
use tasksync::shared::{EntityType, OperationKind, Project, RemoteError, Task};

fn call(entity_type: EntityType, operation: OperationKind, entity_id: &str) -> RemoteCall {
    RemoteCall {
        entity_type,
        operation,
        entity_id: entity_id.to_string(),
    }
}

#[tokio::test]
async fn test_same_entity_operations_delivered_in_creation_order() {
    let env = offline_env().await;
    let offline = env.context.offline();
    let mut task = Task::new("Draft");

    offline.create(task.clone()).await.unwrap();
    task.rename("Final");
    offline.update(task.clone()).await.unwrap();
    offline.delete::<Task>(&task.id).await.unwrap();

    // The create needs three attempts; nothing after it may overtake it
    env.remote.fail_times(2, RemoteError::Timeout);
    env.context.set_online(true);
    let summary = env.context.service().sync_all().await.unwrap();

    assert_eq!(summary.success, 3);
    assert_eq!(
        env.remote.calls(),
        vec![
            call(EntityType::Task, OperationKind::Create, &task.id),
            call(EntityType::Task, OperationKind::Create, &task.id),
            call(EntityType::Task, OperationKind::Create, &task.id),
            call(EntityType::Task, OperationKind::Update, &task.id),
            call(EntityType::Task, OperationKind::Delete, &task.id),
        ]
    );
    assert!(!env.remote.contains(EntityType::Task, &task.id));
}

#[tokio::test]
async fn test_operations_interleave_entity_types_by_timestamp() {
    let env = offline_env().await;
    let offline = env.context.offline();
    let project = Project::new("Work");
    let task = Task::new("Report").with_project(&project.id);
    let other = Project::new("Home");

    offline.create(project.clone()).await.unwrap();
    offline.create(task.clone()).await.unwrap();
    offline.create(other.clone()).await.unwrap();

    env.context.set_online(true);
    env.context.service().sync_all().await.unwrap();

    let order: Vec<String> = env.remote.calls().into_iter().map(|call| call.entity_id).collect();
    assert_eq!(order, vec![project.id, task.id, other.id]);
}

#[tokio::test]
async fn test_failed_operation_does_not_block_later_ones() {
    let env = offline_env().await;
    let offline = env.context.offline();
    let first = Task::new("Rejected");
    let second = Task::new("Accepted");

    offline.create(first.clone()).await.unwrap();
    offline.create(second.clone()).await.unwrap();
    env.remote.fail_next(RemoteError::Unauthorized("token expired".into()));

    env.context.set_online(true);
    let summary = env.context.service().sync_all().await.unwrap();

    assert_eq!((summary.success, summary.failed), (1, 1));
    assert!(env.remote.contains(EntityType::Task, &second.id));
    assert!(!env.remote.contains(EntityType::Task, &first.id));
}

#[tokio::test]
async fn test_batched_passes_drain_the_log() {
    let config = test_config().batch_size(Some(2)).build().unwrap();
    let db = tasksync::client::local_db::LocalDatabase::open_in_memory().await.unwrap();
    let env = env_with(config, db, tasksync::client::remote::InMemoryRemoteStore::new()).await;
    let mut ids = Vec::new();
    for n in 0..5 {
        let task = Task::new(format!("Task {n}"));
        ids.push(task.id.clone());
        env.context.offline().create(task).await.unwrap();
    }

    env.context.set_online(true);
    let first = env.context.service().sync_all().await.unwrap();
    assert_eq!(first.success, 2);

    // Follow-up passes run on their own
    wait_for_pending(&env.context, 0).await;
    let order: Vec<String> = env.remote.calls().into_iter().map(|call| call.entity_id).collect();
    assert_eq!(order, ids);
}

//! Sync passes against an HTTP server

use std::sync::Arc;
use tasksync::client::local_db::LocalDatabase;
use tasksync::client::remote::HttpRemoteStore;
use tasksync::client::SyncContext;
use tasksync::shared::{Project, SyncConfig, Task};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn http_context(server: &MockServer) -> SyncContext {
    let config = SyncConfig::builder()
        .server_url(server.uri())
        .start_offline(true)
        .batch_size(None)
        .build()
        .unwrap();
    let remote = Arc::new(HttpRemoteStore::new(config.clone()).unwrap());
    SyncContext::builder(config)
        .database(LocalDatabase::open_in_memory().await.unwrap())
        .remote(remote)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_queue_drains_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects"))
        .respond_with(|request: &Request| ResponseTemplate::new(201).set_body_bytes(request.body.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/api/projects/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let context = http_context(&server).await;
    let mut project = Project::new("Home");
    context.offline().create(project.clone()).await.unwrap();
    project.archived = true;
    context.offline().update(project).await.unwrap();

    context.set_online(true);
    let summary = context.service().sync_all().await.unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(context.notifier().pending_count(), 0);
}

#[tokio::test]
async fn test_delete_of_missing_remote_record_counts_as_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .respond_with(|request: &Request| ResponseTemplate::new(201).set_body_bytes(request.body.clone()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such task"))
        .expect(1)
        .mount(&server)
        .await;

    let context = http_context(&server).await;
    let task = Task::new("Ephemeral");
    context.offline().create(task.clone()).await.unwrap();
    context.offline().delete::<Task>(&task.id).await.unwrap();

    context.set_online(true);
    let summary = context.service().sync_all().await.unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("title too long"))
        .expect(1)
        .mount(&server)
        .await;

    let context = http_context(&server).await;
    context.offline().create(Task::new("x".repeat(10))).await.unwrap();

    context.set_online(true);
    let summary = context.service().sync_all().await.unwrap();

    assert_eq!(summary.failed, 1);
    let stalled = context.service().stalled_operations().await.unwrap();
    assert_eq!(stalled[0].attempts, 1);
    assert!(stalled[0].last_error.as_deref().unwrap().contains("title too long"));
}

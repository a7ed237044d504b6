//! Queue durability across restarts

use crate::common::*;
use pretty_assertions::assert_eq;
use tasksync::client::local_db::LocalDatabase;
use tasksync::shared::{EntityType, Project, Task, TimeBlock, TimeTracking};

#[tokio::test]
async fn test_pending_operations_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");

    let (before, project_id, task_id) = {
        let env = file_env(&path).await;
        let offline = env.context.offline();

        let project = Project::new("Garden");
        let mut task = Task::new("Plant tulips").with_project(&project.id);
        let mut tracking = TimeTracking::start(&task.id);
        let now = chrono::Utc::now();
        let block = TimeBlock::new(&task.id, now, now + chrono::Duration::hours(1));

        offline.create(project.clone()).await.unwrap();
        offline.create(task.clone()).await.unwrap();
        offline.create(tracking.clone()).await.unwrap();
        offline.create(block.clone()).await.unwrap();
        task.rename("Plant tulips and crocuses");
        offline.update(task.clone()).await.unwrap();
        tracking.stop(chrono::Utc::now());
        offline.update(tracking).await.unwrap();
        offline.delete::<TimeBlock>(&block.id).await.unwrap();

        let before = offline.log().ordered().await.unwrap();
        env.context.close().await;
        (before, project.id, task.id)
    };
    assert_eq!(before.len(), 7);

    let db = LocalDatabase::open(&path).await.unwrap();
    let mut after = db.get_pending_operations().await.unwrap();
    after.sort_by_key(|op| op.timestamp);
    assert_eq!(after, before);

    let cached: Vec<Task> = db.tasks_for_project(&project_id).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].title, "Plant tulips and crocuses");
    assert!(db.time_blocks_for_task(&task_id).await.unwrap().is_empty());
    db.close().await;
}

#[tokio::test]
async fn test_restarted_queue_is_delivered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");

    {
        let env = file_env(&path).await;
        env.context.offline().create(Project::new("Errands")).await.unwrap();
        env.context.offline().create(Task::new("Post letter")).await.unwrap();
        env.context.close().await;
    }

    let env = file_env(&path).await;
    assert_eq!(env.context.notifier().pending_count(), 2);

    env.context.set_online(true);
    let summary = env.context.service().sync_all().await.unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(env.remote.len(EntityType::Project), 1);
    assert_eq!(env.remote.len(EntityType::Task), 1);
    assert!(env.context.db().last_sync_time(EntityType::Task).await.unwrap().is_some());
    env.context.close().await;
}

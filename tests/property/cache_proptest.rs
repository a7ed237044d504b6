//! Property-based tests for the entity cache

use proptest::prelude::*;
use tasksync::client::local_db::LocalDatabase;
use tasksync::shared::{Project, Task};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_put_twice_equals_put_once(
        title in "[a-zA-Z0-9 ]{1,40}",
        with_project in any::<bool>(),
    ) {
        let (once, twice) = runtime().block_on(async {
            let project = Project::new("Parent");
            let mut task = Task::new(title.clone());
            if with_project {
                task = task.with_project(&project.id);
            }

            let single = LocalDatabase::open_in_memory().await.unwrap();
            single.put(&task).await.unwrap();

            let double = LocalDatabase::open_in_memory().await.unwrap();
            double.put(&task).await.unwrap();
            double.put(&task).await.unwrap();

            let snapshot = |db: LocalDatabase| {
                let project_id = project.id.clone();
                async move {
                    let all: Vec<Task> = db.get_all().await.unwrap();
                    let by_project = db.tasks_for_project(&project_id).await.unwrap();
                    let stats = db.get_stats().await.unwrap();
                    (all, by_project, stats.cached(tasksync::shared::EntityType::Task))
                }
            };
            (snapshot(single).await, snapshot(double).await)
        });

        prop_assert_eq!(once, twice);
    }
}

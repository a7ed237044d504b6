//! # Pending Operation Log
//!
//! Ordered view over the pending operations stored in the local database.
//! Holds no state of its own: every call reads the table and sorts it by
//! creation timestamp, so the view can never drift from what is durable.
//!
//! ## Features
//!
//! - **Delivery Order**: stable sort by `timestamp`, ties broken by insertion order
//! - **Eligibility**: operations flagged for manual resolution are set aside
//! - **Per-Entity History**: every queued change of one entity, oldest first

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::operation::PendingOperation;
use std::sync::Arc;

/// Ordered accessor over the `pending_operations` table
#[derive(Debug, Clone)]
pub struct PendingOperationLog {
    db: Arc<LocalDatabase>,
}

impl PendingOperationLog {
    pub fn new(db: Arc<LocalDatabase>) -> Self {
        Self { db }
    }

    /// Every pending operation, oldest first
    pub async fn ordered(&self) -> Result<Vec<PendingOperation>> {
        let mut operations = self.db.get_pending_operations().await?;
        // `sort_by_key` is stable; rows arrive in insertion order
        operations.sort_by_key(|op| op.timestamp);
        Ok(operations)
    }

    /// Operations an automatic pass may deliver, oldest first
    pub async fn eligible(&self) -> Result<Vec<PendingOperation>> {
        let mut operations = self.ordered().await?;
        operations.retain(|op| !op.requires_resolution);
        Ok(operations)
    }

    /// Operations waiting for manual resolution, oldest first
    pub async fn stalled(&self) -> Result<Vec<PendingOperation>> {
        let mut operations = self.ordered().await?;
        operations.retain(|op| op.requires_resolution);
        Ok(operations)
    }

    /// Queued changes of a single entity, oldest first
    pub async fn for_entity(&self, entity_id: &str) -> Result<Vec<PendingOperation>> {
        let mut operations = self.ordered().await?;
        operations.retain(|op| op.entity_id == entity_id);
        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::entities::{Project, Task};
    use crate::shared::operation::{EntityPayload, OperationKind};
    use chrono::Duration;
    use uuid::Uuid;

    async fn log() -> (Arc<LocalDatabase>, PendingOperationLog) {
        let db = Arc::new(LocalDatabase::open_in_memory().await.unwrap());
        (db.clone(), PendingOperationLog::new(db))
    }

    #[tokio::test]
    async fn test_ordered_by_timestamp_not_insertion() {
        let (db, log) = log().await;
        let late = PendingOperation::new(OperationKind::Create, EntityPayload::Task(Task::new("late")));
        let mut early = PendingOperation::new(OperationKind::Create, EntityPayload::Project(Project::new("early")));
        early.timestamp = late.timestamp - Duration::seconds(10);

        db.add_pending_operation(&late).await.unwrap();
        db.add_pending_operation(&early).await.unwrap();

        let ids: Vec<Uuid> = log.ordered().await.unwrap().iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_insertion_order() {
        let (db, log) = log().await;
        let task = Task::new("same instant");
        let create = PendingOperation::new(OperationKind::Create, EntityPayload::Task(task.clone()));
        let mut delete = PendingOperation::new(OperationKind::Delete, EntityPayload::Task(task.clone()));
        delete.timestamp = create.timestamp;

        db.add_pending_operation(&create).await.unwrap();
        db.add_pending_operation(&delete).await.unwrap();

        let history = log.for_entity(&task.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].operation, OperationKind::Create);
        assert_eq!(history[1].operation, OperationKind::Delete);
    }

    #[tokio::test]
    async fn test_eligible_and_stalled_partition() {
        let (db, log) = log().await;
        let fine = PendingOperation::new(OperationKind::Update, EntityPayload::Task(Task::new("fine")));
        let mut stuck = PendingOperation::new(OperationKind::Update, EntityPayload::Task(Task::new("stuck")));
        stuck.requires_resolution = true;
        db.add_pending_operation(&fine).await.unwrap();
        db.add_pending_operation(&stuck).await.unwrap();

        assert_eq!(log.eligible().await.unwrap()[0].id, fine.id);
        assert_eq!(log.stalled().await.unwrap()[0].id, stuck.id);
        assert_eq!(log.ordered().await.unwrap().len(), 2);
    }
}

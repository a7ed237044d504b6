//! # Pending Operation Storage
//!
//! Persistence for the pending operation log. Rows are keyed by operation id
//! and indexed by creation timestamp; the `timestamp` and `last_attempt`
//! columns hold microseconds since the Unix epoch.
//!
//! `apply_and_enqueue` is the storage half of a local mutation: it writes the
//! optimistic cache change and appends the operation in one transaction, so
//! the cache and the log can never disagree after a crash.

use crate::client::local_db::entities::{delete_entity, upsert_payload};
use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::error::StorageError;
use crate::shared::operation::{EntityPayload, EntityType, OperationKind, PendingOperation};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const TABLE: &str = "pending_operations";

const SELECT_COLUMNS: &str = "SELECT id, entity_type, entity_id, operation, data, timestamp, attempts,
        last_attempt, last_error, requires_resolution FROM pending_operations";

impl LocalDatabase {
    /// Write the optimistic cache effect of `op` and append it to the log, atomically
    pub async fn apply_and_enqueue(&self, op: &PendingOperation) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        match op.operation {
            OperationKind::Create | OperationKind::Update => upsert_payload(&mut tx, &op.data).await?,
            OperationKind::Delete => delete_entity(&mut tx, op.entity_type(), &op.entity_id).await?,
        }
        upsert_operation(&mut tx, op).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Insert a pending operation; re-adding the same id overwrites it
    pub async fn add_pending_operation(&self, op: &PendingOperation) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        upsert_operation(&mut conn, op).await
    }

    /// Persist attempt bookkeeping and payload changes of an existing operation
    pub async fn update_pending_operation(&self, op: &PendingOperation) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        upsert_operation(&mut conn, op).await
    }

    /// Remove an operation from the log; absent ids are ignored
    pub async fn delete_pending_operation(&self, id: Uuid) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        remove_operation(&mut conn, id).await
    }

    pub async fn get_pending_operation(&self, id: Uuid) -> Result<Option<PendingOperation>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.map(|row| decode_operation(&row)).transpose()
    }

    /// All pending operations in insertion order. Callers sort by `timestamp`.
    pub async fn get_pending_operations(&self) -> Result<Vec<PendingOperation>> {
        let mut conn = self.pool().acquire().await?;
        fetch_operations(&mut conn).await
    }

    pub async fn count_pending_operations(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_operations")
            .fetch_one(self.pool())
            .await?;
        Ok(count as usize)
    }

    /// Operations flagged for manual resolution
    pub async fn count_stalled_operations(&self) -> Result<usize> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pending_operations WHERE requires_resolution = 1")
                .fetch_one(self.pool())
                .await?;
        Ok(count as usize)
    }
}

pub(crate) async fn fetch_operations(conn: &mut SqliteConnection) -> Result<Vec<PendingOperation>> {
    let rows = sqlx::query(&format!("{} ORDER BY rowid ASC", SELECT_COLUMNS))
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(decode_operation).collect()
}

pub(crate) async fn remove_operation(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM pending_operations WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_operation(conn: &mut SqliteConnection, op: &PendingOperation) -> Result<()> {
    let data = serde_json::to_string(&op.data)?;

    sqlx::query(
        "INSERT INTO pending_operations (
            id, entity_type, entity_id, operation, data, timestamp,
            attempts, last_attempt, last_error, requires_resolution
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            entity_id = excluded.entity_id,
            data = excluded.data,
            attempts = excluded.attempts,
            last_attempt = excluded.last_attempt,
            last_error = excluded.last_error,
            requires_resolution = excluded.requires_resolution",
    )
    .bind(op.id.to_string())
    .bind(op.entity_type().as_str())
    .bind(&op.entity_id)
    .bind(op.operation.as_str())
    .bind(data)
    .bind(op.timestamp.timestamp_micros())
    .bind(i64::from(op.attempts))
    .bind(op.last_attempt.map(|at| at.timestamp_micros()))
    .bind(op.last_error.as_deref())
    .bind(op.requires_resolution)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StorageError::corrupt(TABLE, format!("timestamp out of range: {}", micros)))
}

fn decode_operation(row: &sqlx::sqlite::SqliteRow) -> Result<PendingOperation> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).map_err(|e| StorageError::corrupt(TABLE, format!("bad id '{}': {}", id, e)))?;

    let entity_type: String = row.try_get("entity_type")?;
    let entity_type = EntityType::parse(&entity_type)
        .ok_or_else(|| StorageError::corrupt(TABLE, format!("unknown entity type '{}'", entity_type)))?;

    let operation: String = row.try_get("operation")?;
    let operation = OperationKind::parse(&operation)
        .ok_or_else(|| StorageError::corrupt(TABLE, format!("unknown operation '{}'", operation)))?;

    let data: String = row.try_get("data")?;
    let data: EntityPayload = serde_json::from_str(&data)?;
    if data.entity_type() != entity_type {
        return Err(StorageError::corrupt(
            TABLE,
            format!("operation {} tagged {} carries a {} payload", id, entity_type, data.entity_type()),
        ));
    }

    let attempts: i64 = row.try_get("attempts")?;
    let last_attempt: Option<i64> = row.try_get("last_attempt")?;

    Ok(PendingOperation {
        id,
        entity_id: row.try_get("entity_id")?,
        operation,
        data,
        timestamp: micros_to_datetime(row.try_get("timestamp")?)?,
        attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        last_attempt: last_attempt.map(micros_to_datetime).transpose()?,
        last_error: row.try_get("last_error")?,
        requires_resolution: row.try_get("requires_resolution")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::entities::{Project, Task};
    use pretty_assertions::assert_eq;

    fn task_op(kind: OperationKind, task: &Task) -> PendingOperation {
        PendingOperation::new(kind, EntityPayload::Task(task.clone()))
    }

    #[tokio::test]
    async fn test_pending_operation_round_trip() {
        let db = LocalDatabase::open_in_memory().await.unwrap();
        let mut op = task_op(OperationKind::Create, &Task::new("Buy milk"));
        op.attempts = 2;
        op.last_attempt = Some(crate::shared::operation::now_micros());
        op.last_error = Some("Network error: reset".to_string());

        db.add_pending_operation(&op).await.unwrap();

        let stored = db.get_pending_operation(op.id).await.unwrap();
        assert_eq!(stored, Some(op));
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = LocalDatabase::open_in_memory().await.unwrap();
        let op = task_op(OperationKind::Update, &Task::new("Buy milk"));

        db.add_pending_operation(&op).await.unwrap();
        db.add_pending_operation(&op).await.unwrap();

        assert_eq!(db.count_pending_operations().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_insertion_order() {
        let db = LocalDatabase::open_in_memory().await.unwrap();
        let mut first = task_op(OperationKind::Create, &Task::new("First"));
        let second = task_op(OperationKind::Create, &Task::new("Second"));
        db.add_pending_operation(&first).await.unwrap();
        db.add_pending_operation(&second).await.unwrap();

        first.attempts = 1;
        db.update_pending_operation(&first).await.unwrap();

        let ids: Vec<Uuid> = db.get_pending_operations().await.unwrap().iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_delete_pending_operation() {
        let db = LocalDatabase::open_in_memory().await.unwrap();
        let op = task_op(OperationKind::Create, &Task::new("Buy milk"));
        db.add_pending_operation(&op).await.unwrap();

        db.delete_pending_operation(op.id).await.unwrap();
        db.delete_pending_operation(op.id).await.unwrap();

        assert_eq!(db.count_pending_operations().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_apply_and_enqueue_writes_cache_and_log() {
        let db = LocalDatabase::open_in_memory().await.unwrap();
        let project = Project::new("Home");
        let create = PendingOperation::new(OperationKind::Create, EntityPayload::Project(project.clone()));

        db.apply_and_enqueue(&create).await.unwrap();
        assert_eq!(db.get::<Project>(&project.id).await.unwrap(), Some(project.clone()));
        assert_eq!(db.count_pending_operations().await.unwrap(), 1);

        let delete = PendingOperation::new(OperationKind::Delete, EntityPayload::Project(project.clone()));
        db.apply_and_enqueue(&delete).await.unwrap();
        assert!(db.get::<Project>(&project.id).await.unwrap().is_none());
        assert_eq!(db.count_pending_operations().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stalled_count() {
        let db = LocalDatabase::open_in_memory().await.unwrap();
        let mut op = task_op(OperationKind::Update, &Task::new("Stuck"));
        op.requires_resolution = true;
        db.add_pending_operation(&op).await.unwrap();
        db.add_pending_operation(&task_op(OperationKind::Update, &Task::new("Fine"))).await.unwrap();

        assert_eq!(db.count_pending_operations().await.unwrap(), 2);
        assert_eq!(db.count_stalled_operations().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let db = LocalDatabase::open_in_memory().await.unwrap();
        let op = task_op(OperationKind::Create, &Task::new("Buy milk"));
        db.add_pending_operation(&op).await.unwrap();
        sqlx::query("UPDATE pending_operations SET entity_type = 'message'")
            .execute(db.pool())
            .await
            .unwrap();

        let result = db.get_pending_operations().await;
        assert!(matches!(result, Err(StorageError::Corrupt { table: "pending_operations", .. })));
    }
}

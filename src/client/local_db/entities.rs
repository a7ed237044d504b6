//! # Entity Cache Operations
//!
//! Typed CRUD over the cached entity collections. Every read and write is
//! keyed by entity id; `get_all_by_index` serves the foreign-key lookups
//! (tasks by project, time trackings by task, ...).
//!
//! Writes are idempotent: `put` is an upsert and `delete` of a missing id is a
//! no-op. "Not found" is never an error.
//!
//! The connection-level helpers are crate-visible so that the pending log and
//! the id reconciler can compose them inside a single transaction.

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::entities::{Project, SyncEntity, Task, TimeBlock, TimeTracking};
use crate::shared::error::StorageError;
use crate::shared::operation::{EntityPayload, EntityType};
use sqlx::{Row, SqliteConnection};

impl LocalDatabase {
    /// Get a cached entity by id
    pub async fn get<E: SyncEntity>(&self, id: &str) -> Result<Option<E>> {
        let mut conn = self.pool().acquire().await?;
        fetch_entity(&mut conn, id).await
    }

    /// Get every cached entity of one type
    pub async fn get_all<E: SyncEntity>(&self) -> Result<Vec<E>> {
        let table = E::ENTITY_TYPE.table();
        let rows = sqlx::query(&format!("SELECT data FROM {} ORDER BY rowid ASC", table))
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(|row| decode_entity(table, row)).collect()
    }

    /// Get cached entities whose secondary index `index` equals `key`
    pub async fn get_all_by_index<E: SyncEntity>(&self, index: &str, key: &str) -> Result<Vec<E>> {
        let mut conn = self.pool().acquire().await?;
        fetch_by_index(&mut conn, index, key).await
    }

    /// Upsert an entity into the cache
    pub async fn put<E: SyncEntity>(&self, entity: &E) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        upsert_entity(&mut conn, entity).await
    }

    /// Remove an entity from the cache; absent ids are ignored
    pub async fn delete<E: SyncEntity>(&self, id: &str) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        delete_entity(&mut conn, E::ENTITY_TYPE, id).await
    }

    /// Tasks belonging to a project
    pub async fn tasks_for_project(&self, project_id: &str) -> Result<Vec<Task>> {
        self.get_all_by_index("project_id", project_id).await
    }

    /// Direct subtasks of a task
    pub async fn subtasks(&self, parent_task_id: &str) -> Result<Vec<Task>> {
        self.get_all_by_index("parent_task_id", parent_task_id).await
    }

    pub async fn time_trackings_for_task(&self, task_id: &str) -> Result<Vec<TimeTracking>> {
        self.get_all_by_index("task_id", task_id).await
    }

    pub async fn time_blocks_for_task(&self, task_id: &str) -> Result<Vec<TimeBlock>> {
        self.get_all_by_index("task_id", task_id).await
    }

    /// Look up the cached payload of any entity type
    pub async fn get_payload(&self, entity_type: EntityType, id: &str) -> Result<Option<EntityPayload>> {
        let mut conn = self.pool().acquire().await?;
        fetch_payload(&mut conn, entity_type, id).await
    }
}

fn decode_entity<E: SyncEntity>(table: &'static str, row: &sqlx::sqlite::SqliteRow) -> Result<E> {
    let data: String = row.try_get("data")?;
    serde_json::from_str(&data)
        .map_err(|e| StorageError::corrupt(table, format!("undecodable entity: {}", e)))
}

pub(crate) async fn fetch_entity<E: SyncEntity>(conn: &mut SqliteConnection, id: &str) -> Result<Option<E>> {
    let table = E::ENTITY_TYPE.table();
    let row = sqlx::query(&format!("SELECT data FROM {} WHERE id = ?", table))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(decode_entity(table, &row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn fetch_by_index<E: SyncEntity>(
    conn: &mut SqliteConnection,
    index: &str,
    key: &str,
) -> Result<Vec<E>> {
    let table = E::ENTITY_TYPE.table();
    // Only whitelisted column names are ever interpolated
    let Some(column) = E::ENTITY_TYPE.indexes().iter().find(|column| **column == index) else {
        return Err(StorageError::UnknownIndex {
            table,
            index: index.to_string(),
        });
    };

    let rows = sqlx::query(&format!("SELECT data FROM {} WHERE {} = ? ORDER BY rowid ASC", table, column))
        .bind(key)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(|row| decode_entity(table, row)).collect()
}

pub(crate) async fn upsert_entity<E: SyncEntity>(conn: &mut SqliteConnection, entity: &E) -> Result<()> {
    let entity_type = E::ENTITY_TYPE;
    let indexes = entity_type.indexes();

    let mut columns = vec!["id", "data", "cached_at"];
    columns.extend_from_slice(indexes);
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates = columns[1..]
        .iter()
        .map(|column| format!("{column} = excluded.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        entity_type.table(),
        columns.join(", "),
        placeholders,
        updates
    );

    let data = serde_json::to_string(entity)?;
    let mut query = sqlx::query(&sql)
        .bind(entity.id())
        .bind(data)
        .bind(chrono::Utc::now().to_rfc3339());
    for value in entity.index_values() {
        query = query.bind(value);
    }
    query.execute(&mut *conn).await?;
    Ok(())
}

pub(crate) async fn delete_entity(conn: &mut SqliteConnection, entity_type: EntityType, id: &str) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE id = ?", entity_type.table()))
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_payload(conn: &mut SqliteConnection, payload: &EntityPayload) -> Result<()> {
    match payload {
        EntityPayload::Task(task) => upsert_entity(conn, task).await,
        EntityPayload::Project(project) => upsert_entity(conn, project).await,
        EntityPayload::TimeTracking(tracking) => upsert_entity(conn, tracking).await,
        EntityPayload::TimeBlock(block) => upsert_entity(conn, block).await,
    }
}

pub(crate) async fn fetch_payload(
    conn: &mut SqliteConnection,
    entity_type: EntityType,
    id: &str,
) -> Result<Option<EntityPayload>> {
    Ok(match entity_type {
        EntityType::Task => fetch_entity::<Task>(conn, id).await?.map(EntityPayload::Task),
        EntityType::Project => fetch_entity::<Project>(conn, id).await?.map(EntityPayload::Project),
        EntityType::TimeTracking => fetch_entity::<TimeTracking>(conn, id)
            .await?
            .map(EntityPayload::TimeTracking),
        EntityType::TimeBlock => fetch_entity::<TimeBlock>(conn, id).await?.map(EntityPayload::TimeBlock),
    })
}

pub(crate) async fn fetch_all_payloads(
    conn: &mut SqliteConnection,
    entity_type: EntityType,
) -> Result<Vec<EntityPayload>> {
    let table = entity_type.table();
    let rows = sqlx::query(&format!("SELECT data FROM {} ORDER BY rowid ASC", table))
        .fetch_all(&mut *conn)
        .await?;
    rows.iter()
        .map(|row| {
            Ok(match entity_type {
                EntityType::Task => EntityPayload::Task(decode_entity(table, row)?),
                EntityType::Project => EntityPayload::Project(decode_entity(table, row)?),
                EntityType::TimeTracking => EntityPayload::TimeTracking(decode_entity(table, row)?),
                EntityType::TimeBlock => EntityPayload::TimeBlock(decode_entity(table, row)?),
            })
        })
        .collect()
}

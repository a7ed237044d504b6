//! # Sync Metadata Operations
//!
//! Key/value bookkeeping for synchronization, chiefly the time of the last
//! successful delivery per collection (`last_sync:<table>`).

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::error::StorageError;
use crate::shared::operation::EntityType;
use chrono::{DateTime, Utc};
use sqlx::Row;

fn last_sync_key(entity_type: EntityType) -> String {
    format!("last_sync:{}", entity_type.table())
}

impl LocalDatabase {
    /// Set sync metadata
    pub async fn set_sync_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO sync_metadata (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Get sync metadata
    pub async fn get_sync_metadata(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM sync_metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    /// Record a successful delivery for a collection
    pub async fn set_last_sync_time(&self, entity_type: EntityType, at: DateTime<Utc>) -> Result<()> {
        self.set_sync_metadata(&last_sync_key(entity_type), &at.to_rfc3339()).await
    }

    /// Time of the last successful delivery for a collection
    pub async fn last_sync_time(&self, entity_type: EntityType) -> Result<Option<DateTime<Utc>>> {
        let Some(value) = self.get_sync_metadata(&last_sync_key(entity_type)).await? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&value)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| StorageError::corrupt("sync_metadata", format!("bad timestamp '{}': {}", value, e)))
    }
}

//! # Local Database Module
//!
//! Durable, restart-surviving storage for the offline-first sync engine,
//! backed by SQLite through `sqlx`.
//!
//! ## Architecture
//!
//! The local database holds two kinds of data:
//! - **Entity Cache**: `tasks`, `projects`, `time_trackings`, `time_blocks`, keyed by
//!   entity id with secondary indexes on foreign keys
//! - **Pending Operations**: the append log of local mutations awaiting delivery,
//!   keyed by operation id with a secondary index on creation timestamp
//! - **Sync Metadata**: last successful sync time per collection
//!
//! ## Key Components
//!
//! - `LocalDatabase`: Connection pool and schema management
//! - `schema.rs`: Schema DDL and migration versions
//! - `entities.rs`: Typed entity cache access
//! - `pending.rs`: Pending operation storage and the atomic mutation write
//! - `sync.rs`: Synchronization metadata
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasksync::client::local_db::LocalDatabase;
//! use tasksync::shared::Task;
//!
//! # async fn example() -> Result<(), tasksync::shared::StorageError> {
//! let db = LocalDatabase::open_in_memory().await?;
//! db.put(&Task::new("Buy milk")).await?;
//! let tasks: Vec<Task> = db.get_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod entities;
pub mod pending;
pub mod sync;

use crate::shared::error::StorageError;
use crate::shared::operation::EntityType;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::str::FromStr;

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Local database connection manager
///
/// Cheap to share behind an `Arc`; every component goes through its accessor
/// methods rather than the pool directly.
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the database file at `path`
    ///
    /// Uses WAL mode so readers don't block the sync writer.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "Opened local database");
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database
    ///
    /// The pool is pinned to a single connection that never expires, since every
    /// new SQLite connection to `:memory:` would see an empty database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Initialize database schema
    ///
    /// Creates all necessary tables and runs any pending migrations.
    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(schema::SCHEMA_SQL).execute(&self.pool).await?;
        self.run_migrations().await
    }

    /// Checks the current schema version and records applied migrations.
    async fn run_migrations(&self) -> Result<()> {
        let (current_version,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;
        if !schema::needs_migration(current_version) {
            tracing::debug!(version = current_version, "Local schema up to date");
            return Ok(());
        }

        for version in schema::get_pending_migrations(current_version) {
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
            tracing::info!(version, "Applied local schema migration");
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection, flushing the WAL
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get database statistics
    ///
    /// Returns row counts per collection for debugging and status displays.
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let mut cached_entities = Vec::with_capacity(EntityType::ALL.len());
        for entity_type in EntityType::ALL {
            let (count,): (i64,) =
                sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", entity_type.table()))
                    .fetch_one(&self.pool)
                    .await?;
            cached_entities.push((entity_type, count as u64));
        }

        Ok(DatabaseStats {
            cached_entities,
            pending_operations: self.count_pending_operations().await? as u64,
            stalled_operations: self.count_stalled_operations().await? as u64,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Cached row count per collection
    pub cached_entities: Vec<(EntityType, u64)>,
    /// Number of pending operations, stalled ones included
    pub pending_operations: u64,
    /// Number of operations flagged for manual resolution
    pub stalled_operations: u64,
}

impl DatabaseStats {
    pub fn cached(&self, entity_type: EntityType) -> u64 {
        self.cached_entities
            .iter()
            .find(|(kind, _)| *kind == entity_type)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

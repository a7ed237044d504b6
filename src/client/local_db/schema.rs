//! Database Schema Definitions
//!
//! Contains the schema DDL and migration bookkeeping.

/// DDL for every table; idempotent
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Schema migration versions
pub const MIGRATION_VERSIONS: &[i32] = &[1];

/// Check if database needs migration
pub fn needs_migration(current_version: i32) -> bool {
    current_version < CURRENT_SCHEMA_VERSION
}

/// Get pending migrations
pub fn get_pending_migrations(current_version: i32) -> Vec<i32> {
    MIGRATION_VERSIONS
        .iter()
        .filter(|&&v| v > current_version)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::operation::EntityType;

    #[test]
    fn test_schema_version() {
        assert_eq!(CURRENT_SCHEMA_VERSION, 1);
        assert!(!needs_migration(CURRENT_SCHEMA_VERSION));
        assert!(needs_migration(0));
    }

    #[test]
    fn test_pending_migrations() {
        assert_eq!(get_pending_migrations(0), vec![1]);
        assert_eq!(get_pending_migrations(1), Vec::<i32>::new());
    }

    #[test]
    fn test_schema_covers_every_collection() {
        for entity_type in EntityType::ALL {
            let create = format!("CREATE TABLE IF NOT EXISTS {} (", entity_type.table());
            assert!(SCHEMA_SQL.contains(&create), "missing table {}", entity_type.table());
            for index in entity_type.indexes() {
                let index_name = format!("idx_{}_{}", entity_type.table(), index);
                assert!(SCHEMA_SQL.contains(&index_name), "missing index {}", index_name);
            }
        }
        assert!(SCHEMA_SQL.contains("idx_pending_operations_timestamp"));
    }
}

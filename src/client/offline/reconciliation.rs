//! # Id Reconciliation
//!
//! Clients generate UUIDs that the remote accepts as primary keys, so a
//! delivered `create` normally keeps its id. When the remote nevertheless
//! answers with a different canonical id, the local state is remapped in a
//! single transaction:
//!
//! - the cached entity is re-keyed under the canonical id
//! - cached children referencing the old id are rewritten
//! - still-queued operations targeting or referencing the old id are rewritten
//!
//! The delivered `create` leaves the log inside the same transaction, so
//! either it is gone and every reference has moved, or it is still queued and
//! nothing has changed.

use crate::client::local_db::entities::{delete_entity, fetch_all_payloads, fetch_payload, upsert_payload};
use crate::client::local_db::pending::{fetch_operations, remove_operation, upsert_operation};
use crate::client::local_db::LocalDatabase;
use crate::shared::error::StorageError;
use crate::shared::operation::EntityType;
use uuid::Uuid;

/// What a remap pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapReport {
    /// The cached entity itself moved to the canonical id
    pub entity_rekeyed: bool,
    /// Cached child entities whose foreign key was rewritten
    pub dependents_updated: usize,
    /// Pending operations whose target or payload was rewritten
    pub operations_updated: usize,
}

/// Remove the delivered create `delivered` from the log and replace every
/// local reference to `old_id` by `new_id`, atomically
pub async fn reconcile_created_id(
    db: &LocalDatabase,
    delivered: Uuid,
    entity_type: EntityType,
    old_id: &str,
    new_id: &str,
) -> Result<RemapReport, StorageError> {
    let mut report = RemapReport::default();
    let mut tx = db.pool().begin().await?;
    remove_operation(&mut tx, delivered).await?;

    if old_id == new_id {
        tx.commit().await?;
        return Ok(report);
    }

    if let Some(mut payload) = fetch_payload(&mut tx, entity_type, old_id).await? {
        delete_entity(&mut tx, entity_type, old_id).await?;
        payload.set_id(new_id.to_string());
        upsert_payload(&mut tx, &payload).await?;
        report.entity_rekeyed = true;
    }

    for dependent in entity_type.dependents() {
        for mut payload in fetch_all_payloads(&mut tx, *dependent).await? {
            if payload.remap_reference(entity_type, old_id, new_id) {
                upsert_payload(&mut tx, &payload).await?;
                report.dependents_updated += 1;
            }
        }
    }

    for mut op in fetch_operations(&mut tx).await? {
        let mut changed = false;
        if op.entity_type() == entity_type && op.entity_id == old_id {
            op.entity_id = new_id.to_string();
            op.data.set_id(new_id.to_string());
            changed = true;
        }
        changed |= op.data.remap_reference(entity_type, old_id, new_id);
        if changed {
            upsert_operation(&mut tx, &op).await?;
            report.operations_updated += 1;
        }
    }

    tx.commit().await?;

    tracing::info!(
        entity_type = %entity_type,
        old_id,
        new_id,
        dependents = report.dependents_updated,
        operations = report.operations_updated,
        "Remapped locally generated id to canonical id"
    );
    Ok(report)
}

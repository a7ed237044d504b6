//! # Optimistic Writes
//!
//! Phase 1 of every local mutation: validate the payload, apply its effect to
//! the entity cache and append the pending operation, all in one local
//! transaction. Nothing here touches the network; delivery is phase 2.

use crate::client::local_db::LocalDatabase;
use crate::shared::error::SyncError;
use crate::shared::operation::{EntityPayload, OperationKind, PendingOperation};
use std::sync::Arc;

/// Applies mutations locally and queues them for delivery
#[derive(Debug, Clone)]
pub struct OptimisticWriter {
    db: Arc<LocalDatabase>,
}

impl OptimisticWriter {
    pub fn new(db: Arc<LocalDatabase>) -> Self {
        Self { db }
    }

    /// Write the optimistic effect of `kind` on `payload` and enqueue it.
    ///
    /// Deletes skip validation: a record that was accepted locally must always
    /// be removable.
    pub async fn apply(&self, kind: OperationKind, payload: EntityPayload) -> Result<PendingOperation, SyncError> {
        if kind != OperationKind::Delete {
            payload.validate()?;
        }

        let op = PendingOperation::new(kind, payload);
        self.db.apply_and_enqueue(&op).await?;

        tracing::debug!(
            op_id = %op.id,
            entity_type = %op.entity_type(),
            entity_id = %op.entity_id,
            operation = %op.operation,
            "Queued local mutation"
        );
        Ok(op)
    }
}

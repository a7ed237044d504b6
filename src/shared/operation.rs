//! # Pending Operations
//!
//! The unit of deferred work: one local mutation of one entity, captured with
//! its full payload so it can be delivered to the remote store later.
//!
//! `EntityPayload` is a tagged union, so every adapter downstream receives a
//! concretely typed entity instead of an untyped JSON blob.

use crate::shared::entities::{Project, SyncEntity, Task, TimeBlock, TimeTracking};
use crate::shared::error::SharedError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Entity collections known to the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Task,
    Project,
    TimeTracking,
    TimeBlock,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Task,
        EntityType::Project,
        EntityType::TimeTracking,
        EntityType::TimeBlock,
    ];

    /// Wire name, also used in the `pending_operations.entity_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Task => "task",
            EntityType::Project => "project",
            EntityType::TimeTracking => "timeTracking",
            EntityType::TimeBlock => "timeBlock",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|entity_type| entity_type.as_str() == value)
    }

    /// Local table holding the cached entities
    pub fn table(&self) -> &'static str {
        match self {
            EntityType::Task => "tasks",
            EntityType::Project => "projects",
            EntityType::TimeTracking => "time_trackings",
            EntityType::TimeBlock => "time_blocks",
        }
    }

    /// Secondary index columns on the local table
    pub fn indexes(&self) -> &'static [&'static str] {
        match self {
            EntityType::Task => &["project_id", "parent_task_id"],
            EntityType::Project => &[],
            EntityType::TimeTracking => &["task_id"],
            EntityType::TimeBlock => &["task_id"],
        }
    }

    /// Path segment of the remote REST collection
    pub fn collection(&self) -> &'static str {
        match self {
            EntityType::Task => "tasks",
            EntityType::Project => "projects",
            EntityType::TimeTracking => "time-trackings",
            EntityType::TimeBlock => "time-blocks",
        }
    }

    /// Entity types whose cached records may reference an entity of this type
    pub fn dependents(&self) -> &'static [EntityType] {
        match self {
            EntityType::Project => &[EntityType::Task],
            EntityType::Task => &[EntityType::Task, EntityType::TimeTracking, EntityType::TimeBlock],
            EntityType::TimeTracking | EntityType::TimeBlock => &[],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of mutation carried by a pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(OperationKind::Create),
            "update" => Some(OperationKind::Update),
            "delete" => Some(OperationKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full entity payload, tagged by entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", content = "data", rename_all = "camelCase")]
pub enum EntityPayload {
    Task(Task),
    Project(Project),
    TimeTracking(TimeTracking),
    TimeBlock(TimeBlock),
}

impl EntityPayload {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityPayload::Task(_) => EntityType::Task,
            EntityPayload::Project(_) => EntityType::Project,
            EntityPayload::TimeTracking(_) => EntityType::TimeTracking,
            EntityPayload::TimeBlock(_) => EntityType::TimeBlock,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityPayload::Task(task) => task.id(),
            EntityPayload::Project(project) => project.id(),
            EntityPayload::TimeTracking(tracking) => tracking.id(),
            EntityPayload::TimeBlock(block) => block.id(),
        }
    }

    pub fn set_id(&mut self, id: String) {
        match self {
            EntityPayload::Task(task) => task.set_id(id),
            EntityPayload::Project(project) => project.set_id(id),
            EntityPayload::TimeTracking(tracking) => tracking.set_id(id),
            EntityPayload::TimeBlock(block) => block.set_id(id),
        }
    }

    pub fn remap_reference(&mut self, target: EntityType, old_id: &str, new_id: &str) -> bool {
        match self {
            EntityPayload::Task(task) => task.remap_reference(target, old_id, new_id),
            EntityPayload::Project(project) => project.remap_reference(target, old_id, new_id),
            EntityPayload::TimeTracking(tracking) => tracking.remap_reference(target, old_id, new_id),
            EntityPayload::TimeBlock(block) => block.remap_reference(target, old_id, new_id),
        }
    }

    pub fn validate(&self) -> Result<(), SharedError> {
        match self {
            EntityPayload::Task(task) => task.validate(),
            EntityPayload::Project(project) => project.validate(),
            EntityPayload::TimeTracking(tracking) => tracking.validate(),
            EntityPayload::TimeBlock(block) => block.validate(),
        }
    }
}

/// Current time truncated to the microsecond precision used by the local store
pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A local mutation waiting to be delivered to the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Operation id, independent of the entity id
    pub id: Uuid,
    /// Id of the affected entity
    pub entity_id: String,
    pub operation: OperationKind,
    /// Entity payload at capture time. Deletes keep it for inspection only.
    pub data: EntityPayload,
    /// Creation time; defines delivery order
    pub timestamp: DateTime<Utc>,
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Set once retries are exhausted or the remote rejected the change for good
    pub requires_resolution: bool,
}

impl PendingOperation {
    pub fn new(operation: OperationKind, data: EntityPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: data.id().to_string(),
            operation,
            data,
            timestamp: now_micros(),
            attempts: 0,
            last_attempt: None,
            last_error: None,
            requires_resolution: false,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.data.entity_type()
    }
}

//! # Domain Entities
//!
//! Cached mirrors of the remote records: projects, hierarchical tasks, time
//! trackings and calendar time-blocks. Field names serialize in camelCase so
//! that a cached record and the remote JSON representation are identical.
//!
//! All temporal fields are normalized to `DateTime<Utc>`.
//!
//! ## Usage
//!
//! ```rust
//! use tasksync::shared::entities::{Project, Task, SyncEntity};
//!
//! let project = Project::new("Groceries");
//! let task = Task::new("Buy milk").with_project(project.id());
//! assert_eq!(task.project_id.as_deref(), Some(project.id()));
//! ```

use crate::shared::error::SharedError;
use crate::shared::operation::{EntityPayload, EntityType};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability shared by every entity the sync engine can carry.
///
/// Implementors are plain data records. The trait exposes what the local store
/// needs to key and index them, what the id reconciler needs to rewrite
/// references, and the conversions into the [`EntityPayload`] tagged union.
pub trait SyncEntity:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static
{
    /// Discriminant of this entity type
    const ENTITY_TYPE: EntityType;

    /// Stable identifier
    fn id(&self) -> &str;

    /// Replace the identifier (used when the remote assigns a canonical id)
    fn set_id(&mut self, id: String);

    /// Values for the secondary indexes, aligned with `ENTITY_TYPE.indexes()`
    fn index_values(&self) -> Vec<Option<&str>>;

    /// Rewrite a foreign reference to an entity of `target` type.
    ///
    /// Returns `true` if any field changed.
    fn remap_reference(&mut self, target: EntityType, old_id: &str, new_id: &str) -> bool;

    /// Reject payloads that can never be accepted remotely
    fn validate(&self) -> Result<(), SharedError>;

    fn into_payload(self) -> EntityPayload;

    fn from_payload(payload: &EntityPayload) -> Option<&Self>;
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn remap_field(field: &mut Option<String>, old_id: &str, new_id: &str) -> bool {
    match field {
        Some(current) if current == old_id => {
            *current = new_id.to_string();
            true
        }
        _ => false,
    }
}

/// A project groups tasks. Projects have no parent reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a project with a fresh client-side UUID
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            color: None,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SyncEntity for Project {
    const ENTITY_TYPE: EntityType = EntityType::Project;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn index_values(&self) -> Vec<Option<&str>> {
        Vec::new()
    }

    fn remap_reference(&mut self, _target: EntityType, _old_id: &str, _new_id: &str) -> bool {
        false
    }

    fn validate(&self) -> Result<(), SharedError> {
        if self.name.trim().is_empty() {
            return Err(SharedError::validation("name", "Project name cannot be empty"));
        }
        Ok(())
    }

    fn into_payload(self) -> EntityPayload {
        EntityPayload::Project(self)
    }

    fn from_payload(payload: &EntityPayload) -> Option<&Self> {
        match payload {
            EntityPayload::Project(project) => Some(project),
            _ => None,
        }
    }
}

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A task, optionally inside a project and optionally nested under a parent task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Opaque recurrence pattern, interpreted by the calendar layer
    #[serde(default)]
    pub recurrence: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a top-level task with a fresh client-side UUID
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            project_id: None,
            parent_task_id: None,
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            recurrence: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.parent_task_id = Some(parent_task_id.into());
        self
    }

    /// Change the title and bump `updated_at`
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }
}

impl SyncEntity for Task {
    const ENTITY_TYPE: EntityType = EntityType::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn index_values(&self) -> Vec<Option<&str>> {
        vec![self.project_id.as_deref(), self.parent_task_id.as_deref()]
    }

    fn remap_reference(&mut self, target: EntityType, old_id: &str, new_id: &str) -> bool {
        match target {
            EntityType::Project => remap_field(&mut self.project_id, old_id, new_id),
            EntityType::Task => remap_field(&mut self.parent_task_id, old_id, new_id),
            _ => false,
        }
    }

    fn validate(&self) -> Result<(), SharedError> {
        if self.title.trim().is_empty() {
            return Err(SharedError::validation("title", "Task title cannot be empty"));
        }
        if self.parent_task_id.as_deref() == Some(self.id.as_str()) {
            return Err(SharedError::validation("parentTaskId", "A task cannot be its own parent"));
        }
        Ok(())
    }

    fn into_payload(self) -> EntityPayload {
        EntityPayload::Task(self)
    }

    fn from_payload(payload: &EntityPayload) -> Option<&Self> {
        match payload {
            EntityPayload::Task(task) => Some(task),
            _ => None,
        }
    }
}

/// Time actually spent on a task. `ended_at` is absent while the timer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTracking {
    pub id: String,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeTracking {
    /// Start tracking time on `task_id` now
    pub fn start(task_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            task_id: task_id.into(),
            started_at: now,
            ended_at: None,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stop(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at);
        self.updated_at = Utc::now();
    }

    pub fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }
}

impl SyncEntity for TimeTracking {
    const ENTITY_TYPE: EntityType = EntityType::TimeTracking;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn index_values(&self) -> Vec<Option<&str>> {
        vec![Some(self.task_id.as_str())]
    }

    fn remap_reference(&mut self, target: EntityType, old_id: &str, new_id: &str) -> bool {
        if target == EntityType::Task && self.task_id == old_id {
            self.task_id = new_id.to_string();
            return true;
        }
        false
    }

    fn validate(&self) -> Result<(), SharedError> {
        if self.task_id.is_empty() {
            return Err(SharedError::validation("taskId", "Time tracking must reference a task"));
        }
        if let Some(ended_at) = self.ended_at {
            if ended_at < self.started_at {
                return Err(SharedError::validation("endedAt", "Tracking cannot end before it starts"));
            }
        }
        Ok(())
    }

    fn into_payload(self) -> EntityPayload {
        EntityPayload::TimeTracking(self)
    }

    fn from_payload(payload: &EntityPayload) -> Option<&Self> {
        match payload {
            EntityPayload::TimeTracking(tracking) => Some(tracking),
            _ => None,
        }
    }
}

/// A planned calendar slot for working on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: String,
    pub task_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeBlock {
    pub fn new(task_id: impl Into<String>, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            task_id: task_id.into(),
            title: None,
            starts_at,
            ends_at,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SyncEntity for TimeBlock {
    const ENTITY_TYPE: EntityType = EntityType::TimeBlock;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn index_values(&self) -> Vec<Option<&str>> {
        vec![Some(self.task_id.as_str())]
    }

    fn remap_reference(&mut self, target: EntityType, old_id: &str, new_id: &str) -> bool {
        if target == EntityType::Task && self.task_id == old_id {
            self.task_id = new_id.to_string();
            return true;
        }
        false
    }

    fn validate(&self) -> Result<(), SharedError> {
        if self.task_id.is_empty() {
            return Err(SharedError::validation("taskId", "Time block must reference a task"));
        }
        if self.ends_at <= self.starts_at {
            return Err(SharedError::validation("endsAt", "Time block must end after it starts"));
        }
        Ok(())
    }

    fn into_payload(self) -> EntityPayload {
        EntityPayload::TimeBlock(self)
    }

    fn from_payload(payload: &EntityPayload) -> Option<&Self> {
        match payload {
            EntityPayload::TimeBlock(block) => Some(block),
            _ => None,
        }
    }
}

//! In-Memory Remote Store
//!
//! A remote entity store living in process memory. Records are kept as JSON
//! per collection. Failures can be scripted per call, latency can be added to
//! widen race windows, and every call is logged so tests can assert delivery
//! order.

use crate::client::remote::RemoteEntityStore;
use crate::shared::entities::SyncEntity;
use crate::shared::error::RemoteError;
use crate::shared::operation::{EntityType, OperationKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// One call received by the store, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub entity_type: EntityType,
    pub operation: OperationKind,
    pub entity_id: String,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<EntityType, BTreeMap<String, serde_json::Value>>,
    failures: VecDeque<RemoteError>,
    calls: Vec<RemoteCall>,
}

/// In-process remote entity store
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
    assign_ids: bool,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Ignore client ids on create and assign fresh server-side ids
    pub fn assigning_ids(mut self) -> Self {
        self.assign_ids = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail the next call with `error`
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().failures.push_back(error);
    }

    /// Fail the next `times` calls with `error`
    pub fn fail_times(&self, times: usize, error: RemoteError) {
        let mut inner = self.lock();
        for _ in 0..times {
            inner.failures.push_back(error.clone());
        }
    }

    pub fn get<E: SyncEntity>(&self, id: &str) -> Option<E> {
        self.lock()
            .records
            .get(&E::ENTITY_TYPE)
            .and_then(|records| records.get(id))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn contains(&self, entity_type: EntityType, id: &str) -> bool {
        self.lock()
            .records
            .get(&entity_type)
            .is_some_and(|records| records.contains_key(id))
    }

    pub fn len(&self, entity_type: EntityType) -> usize {
        self.lock().records.get(&entity_type).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.values().all(BTreeMap::is_empty)
    }

    /// Every call received so far, in arrival order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    async fn begin_call(&self, entity_type: EntityType, operation: OperationKind, entity_id: &str) -> Result<(), RemoteError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.lock();
        inner.calls.push(RemoteCall {
            entity_type,
            operation,
            entity_id: entity_id.to_string(),
        });
        match inner.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn encode<E: SyncEntity>(entity: &E) -> Result<serde_json::Value, RemoteError> {
    serde_json::to_value(entity).map_err(|e| RemoteError::Validation(e.to_string()))
}

#[async_trait]
impl<E: SyncEntity> RemoteEntityStore<E> for InMemoryRemoteStore {
    async fn create(&self, entity: &E) -> Result<E, RemoteError> {
        self.begin_call(E::ENTITY_TYPE, OperationKind::Create, entity.id()).await?;

        let mut canonical = entity.clone();
        if self.assign_ids {
            canonical.set_id(Uuid::new_v4().to_string());
        }
        let value = encode(&canonical)?;
        self.lock()
            .records
            .entry(E::ENTITY_TYPE)
            .or_default()
            .insert(canonical.id().to_string(), value);
        Ok(canonical)
    }

    async fn update(&self, entity: &E) -> Result<(), RemoteError> {
        self.begin_call(E::ENTITY_TYPE, OperationKind::Update, entity.id()).await?;

        let value = encode(entity)?;
        let mut inner = self.lock();
        let records = inner.records.entry(E::ENTITY_TYPE).or_default();
        match records.get_mut(entity.id()) {
            Some(existing) => {
                *existing = value;
                Ok(())
            }
            None => Err(RemoteError::NotFound(format!("{} {}", E::ENTITY_TYPE, entity.id()))),
        }
    }

    async fn delete(&self, entity_id: &str) -> Result<(), RemoteError> {
        self.begin_call(E::ENTITY_TYPE, OperationKind::Delete, entity_id).await?;

        let mut inner = self.lock();
        let removed = inner
            .records
            .get_mut(&E::ENTITY_TYPE)
            .and_then(|records| records.remove(entity_id));
        match removed {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(format!("{} {}", E::ENTITY_TYPE, entity_id))),
        }
    }
}

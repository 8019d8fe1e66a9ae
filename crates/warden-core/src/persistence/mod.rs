//! Persistence seams for history and registry snapshots
//!
//! The supervisor only needs an append-only transition log and a keyed
//! resource store. File-backed implementations live in `warden-store`;
//! [`MemorySnapshotStore`] is kept here for embedding and tests.

use crate::types::{Resource, ResourceId, StateTransition};
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Persistence operation errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage path not available")]
    PathUnavailable,
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl From<PersistenceError> for crate::error::WardenError {
    fn from(err: PersistenceError) -> Self {
        crate::error::WardenError::persistence(err.to_string())
    }
}

/// Append-only sink for state transitions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Append one transition; entries arrive in per-resource order
    async fn append(&self, transition: &StateTransition) -> PersistenceResult<()>;

    /// Read back a resource's persisted transitions
    async fn read(&self, resource_id: &str) -> PersistenceResult<Vec<StateTransition>>;
}

/// Keyed store for resource records
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, resource: &Resource) -> PersistenceResult<()>;

    async fn load(&self, id: &str) -> PersistenceResult<Resource>;

    async fn load_all(&self) -> PersistenceResult<Vec<Resource>>;

    async fn remove(&self, id: &str) -> PersistenceResult<()>;

    /// Save every record, stopping at the first error
    async fn save_all(&self, resources: &[Resource]) -> PersistenceResult<()> {
        for resource in resources {
            self.save(resource).await?;
        }
        Ok(())
    }
}

/// In-memory snapshot store
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: DashMap<ResourceId, Resource>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, resource: &Resource) -> PersistenceResult<()> {
        self.records.insert(resource.id.clone(), resource.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> PersistenceResult<Resource> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }

    async fn load_all(&self) -> PersistenceResult<Vec<Resource>> {
        let mut all: Vec<Resource> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn remove(&self, id: &str) -> PersistenceResult<()> {
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))
    }
}

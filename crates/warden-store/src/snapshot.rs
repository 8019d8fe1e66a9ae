//! JSON snapshot store
//!
//! Stores each resource record as `<id>.json`.

use super::paths::{default_dir, record_path};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use warden_core::persistence::{PersistenceError, PersistenceResult, SnapshotStore};
use warden_core::types::Resource;

/// Resource snapshots as JSON files under a base directory
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    base_path: PathBuf,
}

impl JsonSnapshotStore {
    /// Create a store at the default path (~/.warden/snapshots)
    pub fn new() -> PersistenceResult<Self> {
        Ok(Self {
            base_path: default_dir("snapshots")?,
        })
    }

    /// Create a store with a custom base path
    pub fn with_path(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn ensure_dir(&self) -> PersistenceResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    fn snapshot_path(&self, id: &str) -> PathBuf {
        record_path(&self.base_path, id, "json")
    }

    async fn read_resource(path: &Path) -> PersistenceResult<Resource> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn save(&self, resource: &Resource) -> PersistenceResult<()> {
        self.ensure_dir().await?;

        let path = self.snapshot_path(&resource.id);
        let content = serde_json::to_string_pretty(resource)?;

        // Write then rename so a crash never leaves a half-written record
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Saved resource {} to {:?}", resource.id, path);

        Ok(())
    }

    async fn load(&self, id: &str) -> PersistenceResult<Resource> {
        let path = self.snapshot_path(id);

        if !path.exists() {
            return Err(PersistenceError::NotFound(id.to_string()));
        }

        let resource = Self::read_resource(&path).await?;
        debug!("Loaded resource {} from {:?}", id, path);
        Ok(resource)
    }

    async fn load_all(&self) -> PersistenceResult<Vec<Resource>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut resources = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            // Only process .json files
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match Self::read_resource(&path).await {
                Ok(resource) => resources.push(resource),
                Err(e) => warn!("Failed to read resource snapshot from {:?}: {}", path, e),
            }
        }

        resources.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(resources)
    }

    async fn remove(&self, id: &str) -> PersistenceResult<()> {
        let path = self.snapshot_path(id);

        if !path.exists() {
            return Err(PersistenceError::NotFound(id.to_string()));
        }

        fs::remove_file(&path).await?;
        debug!("Deleted resource {} at {:?}", id, path);

        Ok(())
    }
}

//! JSON-lines transition history
//!
//! Each resource gets `<id>.jsonl`; every line is one serialized
//! `StateTransition`, appended in the order the supervisor applied them.

use super::paths::{default_dir, id_from_stem, record_path};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use warden_core::persistence::{HistorySink, PersistenceError, PersistenceResult};
use warden_core::types::StateTransition;

/// Append-only history files under a base directory
#[derive(Debug, Clone)]
pub struct JsonlHistorySink {
    base_path: PathBuf,
}

impl JsonlHistorySink {
    /// Create a sink at the default path (~/.warden/history)
    pub fn new() -> PersistenceResult<Self> {
        Ok(Self {
            base_path: default_dir("history")?,
        })
    }

    /// Create a sink with a custom base path
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

    fn history_path(&self, resource_id: &str) -> PathBuf {
        record_path(&self.base_path, resource_id, "jsonl")
    }

    /// Resource ids that have a history file, sorted
    pub async fn resource_ids(&self) -> PersistenceResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).and_then(id_from_stem) {
                Some(id) => ids.push(id),
                None => debug!(path = %path.display(), "skipping history file with foreign name"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl HistorySink for JsonlHistorySink {
    async fn append(&self, transition: &StateTransition) -> PersistenceResult<()> {
        self.ensure_dir().await?;

        let path = self.history_path(&transition.resource_id);
        let mut line = serde_json::to_string(transition)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(
            resource_id = %transition.resource_id,
            to = %transition.to,
            "appended transition to {:?}",
            path
        );
        Ok(())
    }

    async fn read(&self, resource_id: &str) -> PersistenceResult<Vec<StateTransition>> {
        let path = self.history_path(resource_id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(resource_id.to_string()));
        }

        let content = fs::read_to_string(&path).await?;
        let mut transitions = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StateTransition>(line) {
                Ok(transition) => transitions.push(transition),
                // A crash mid-write leaves a truncated last line
                Err(e) => warn!("Skipping malformed line {} in {:?}: {}", index + 1, path, e),
            }
        }
        Ok(transitions)
    }
}

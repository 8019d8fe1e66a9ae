//! Resource records and lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque resource identifier
pub type ResourceId = String;

/// Lifecycle state of a supervised resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Registered, initial setup not finished
    Idle,
    /// Alive and expected to heartbeat
    Running,
    /// Heartbeat went stale, waiting for recovery or an operator
    Stuck,
    /// A recovery tier is executing
    Recovering,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
}

impl ResourceState {
    /// Every state, in display order
    pub const ALL: [ResourceState; 6] = [
        Self::Idle,
        Self::Running,
        Self::Stuck,
        Self::Recovering,
        Self::Completed,
        Self::Failed,
    ];

    /// Terminal states have no outgoing edges
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// States counted as healthy in aggregate stats
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Idle | Self::Running | Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stuck => "stuck",
            Self::Recovering => "recovering",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed by a resource owner at spawn time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Caller-supplied id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,

    /// Owner data, opaque to the supervisor
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Apply `idle -> running` immediately after registration
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

fn default_auto_start() -> bool {
    true
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            id: None,
            metadata: serde_json::Value::Null,
            auto_start: true,
        }
    }
}

impl ResourceConfig {
    /// Create a config with a generated id
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied id
    pub fn with_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach owner metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Leave the resource `idle` until `start` is called
    pub fn deferred(mut self) -> Self {
        self.auto_start = false;
        self
    }
}

/// One tracked unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub resource_type: String,
    pub state: ResourceState,
    pub created_at: DateTime<Utc>,
    /// Time of the last state change
    pub updated_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
    /// Recovery dispatches so far; never reset
    pub recovery_attempts: u32,
    /// Escalation step; reset by a successful recovery
    pub escalation_tier: u32,
    /// Tier ordinals dispatched since the last successful recovery
    #[serde(default)]
    pub attempted_tiers: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substate: Option<String>,
    /// Most recent recovery or natural failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Resource {
    /// Create an `idle` record
    pub fn new(resource_type: impl Into<String>, config: ResourceConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: config.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            resource_type: resource_type.into(),
            state: ResourceState::Idle,
            created_at: now,
            updated_at: now,
            last_heartbeat_at: now,
            recovery_attempts: 0,
            escalation_tier: 0,
            attempted_tiers: Vec::new(),
            progress: None,
            substate: None,
            last_error: None,
            metadata: config.metadata,
        }
    }

    /// Time since the resource was created, in whole seconds
    pub fn running_duration_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.created_at).num_seconds().max(0) as u64
    }

    /// Whether the heartbeat is older than `timeout` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        let elapsed = now - self.last_heartbeat_at;
        match elapsed.to_std() {
            Ok(elapsed) => elapsed > timeout,
            // Heartbeat in the future relative to `now`
            Err(_) => false,
        }
    }
}

//! Supervisor configuration model

use super::logging_config::LoggingConfig;
use crate::types::RecoveryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Where file-backed persistence keeps its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory; `~` is expanded
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: "~/.warden".to_string(),
        }
    }
}

impl StorageConfig {
    /// Base directory with `~` expanded
    pub fn resolved_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).into_owned())
    }

    pub fn history_dir(&self) -> PathBuf {
        self.resolved_dir().join("history")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.resolved_dir().join("snapshots")
    }
}

/// Top-level supervisor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Health monitor period
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Staleness threshold for types without a policy
    #[serde(with = "humantime_serde")]
    pub default_heartbeat_timeout: Duration,

    /// Upper bound on concurrently executing recovery actions
    pub max_concurrent_recoveries: usize,

    /// Capacity of the supervisor event channel
    pub event_capacity: usize,

    /// Terminal resources older than this are pruned by the monitor
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub terminal_retention: Option<Duration>,

    pub logging: LoggingConfig,

    pub storage: StorageConfig,

    /// Recovery policies keyed by resource type
    pub types: HashMap<String, RecoveryPolicy>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            default_heartbeat_timeout: Duration::from_secs(30),
            max_concurrent_recoveries: 8,
            event_capacity: 256,
            terminal_retention: None,
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            types: HashMap::new(),
        }
    }
}

impl SupervisorConfig {
    /// Set the monitor tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the fallback heartbeat timeout
    pub fn with_default_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.default_heartbeat_timeout = timeout;
        self
    }

    /// Set the recovery worker-pool size
    pub fn with_max_concurrent_recoveries(mut self, max: usize) -> Self {
        self.max_concurrent_recoveries = max;
        self
    }

    /// Enable pruning of terminal resources
    pub fn with_terminal_retention(mut self, retention: Duration) -> Self {
        self.terminal_retention = Some(retention);
        self
    }

    /// Add or replace the policy for a resource type
    pub fn with_policy(mut self, resource_type: impl Into<String>, policy: RecoveryPolicy) -> Self {
        self.types.insert(resource_type.into(), policy);
        self
    }

    /// Policy configured for a resource type
    pub fn policy(&self, resource_type: &str) -> Option<&RecoveryPolicy> {
        self.types.get(resource_type)
    }
}

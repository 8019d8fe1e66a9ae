//! Recovery tiers and per-type recovery policy

use crate::error::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Strategy-call identifier of a recovery tier
///
/// Serialized as its string name; unknown names become `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecoveryAction {
    Restart,
    RestartClean,
    KillAndRespawn,
    Stop,
    Custom(String),
}

impl RecoveryAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Restart => "restart",
            Self::RestartClean => "restart_clean",
            Self::KillAndRespawn => "kill_and_respawn",
            Self::Stop => "stop",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for RecoveryAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "restart" => Self::Restart,
            "restart_clean" => Self::RestartClean,
            "kill_and_respawn" => Self::KillAndRespawn,
            "stop" => Self::Stop,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for RecoveryAction {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RecoveryAction> for String {
    fn from(value: RecoveryAction) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a resource type's escalation ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryTier {
    pub ordinal: u32,
    pub action: RecoveryAction,
    /// Consecutive attempts spent at this tier before escalating
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Deadline for a single attempt
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_max_attempts() -> u32 {
    1
}

impl RecoveryTier {
    pub fn new(ordinal: u32, action: impl Into<RecoveryAction>, timeout: Duration) -> Self {
        Self {
            ordinal,
            action: action.into(),
            max_attempts: 1,
            timeout,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Heartbeat timeout and escalation ladder for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPolicy {
    #[serde(with = "humantime_serde")]
    pub heartbeat_timeout: Duration,
    pub tiers: Vec<RecoveryTier>,
}

impl RecoveryPolicy {
    /// Create a policy; tiers are ordered by ordinal
    pub fn new(heartbeat_timeout: Duration, mut tiers: Vec<RecoveryTier>) -> Self {
        tiers.sort_by_key(|t| t.ordinal);
        Self {
            heartbeat_timeout,
            tiers,
        }
    }

    /// Number of automatic attempts before an intervention is required
    pub fn budget(&self) -> u32 {
        self.tiers.iter().map(|t| t.max_attempts).sum()
    }

    /// Tier to run at escalation step `step`
    ///
    /// Steps past the budget stay on the last tier.
    pub fn tier_for_step(&self, step: u32) -> Option<&RecoveryTier> {
        let mut upper = 0u32;
        for tier in &self.tiers {
            upper = upper.saturating_add(tier.max_attempts);
            if step < upper {
                return Some(tier);
            }
        }
        self.tiers.last()
    }

    /// Whether `step` has used up every automatic attempt
    pub fn is_exhausted(&self, step: u32) -> bool {
        step >= self.budget()
    }

    pub fn validate(&self, resource_type: &str) -> WardenResult<()> {
        if self.heartbeat_timeout.is_zero() {
            return Err(WardenError::config_with_context(
                "heartbeat_timeout must be greater than zero",
                format!("resource type '{}'", resource_type),
            ));
        }
        if self.tiers.is_empty() {
            return Err(WardenError::config_with_context(
                "at least one recovery tier is required",
                format!("resource type '{}'", resource_type),
            ));
        }

        let mut seen = HashSet::new();
        for tier in &self.tiers {
            if !seen.insert(tier.ordinal) {
                return Err(WardenError::config_with_context(
                    format!("duplicate tier ordinal {}", tier.ordinal),
                    format!("resource type '{}'", resource_type),
                ));
            }
            if tier.max_attempts == 0 {
                return Err(WardenError::config_with_context(
                    format!("tier {} has max_attempts = 0", tier.ordinal),
                    format!("resource type '{}'", resource_type),
                ));
            }
            if tier.timeout.is_zero() {
                return Err(WardenError::config_with_context(
                    format!("tier {} has a zero timeout", tier.ordinal),
                    format!("resource type '{}'", resource_type),
                ));
            }
        }
        Ok(())
    }
}

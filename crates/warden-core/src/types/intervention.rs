//! Human intervention requests

use super::{ResourceId, ResourceState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Intervention request identifier
pub type RequestId = String;

/// Built-in outcome applied to a resource when an intervention resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    /// Re-enter recovery at the current tier
    Retry,
    /// Fail the resource, graceful stop
    Stop,
    /// Fail the resource, forced termination
    Kill,
}

impl Directive {
    /// Map a built-in option id to its directive
    pub fn from_option_id(option_id: &str) -> Option<Self> {
        match option_id {
            "retry" => Some(Self::Retry),
            "stop" => Some(Self::Stop),
            "kill" => Some(Self::Kill),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Stop => "stop",
            Self::Kill => "kill",
        }
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the failure that triggered an intervention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureContext {
    pub error: String,
    pub recovery_attempts: u32,
    pub running_duration_secs: u64,
    pub last_state: ResourceState,
    pub failed_at: DateTime<Utc>,
}

/// A choice offered to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionOption {
    pub id: String,
    pub label: String,
    pub description: String,
    pub destructive: bool,
}

impl InterventionOption {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        destructive: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            destructive,
        }
    }

    pub fn retry() -> Self {
        Self::new(
            "retry",
            "Retry",
            "Run the current recovery tier again",
            false,
        )
    }

    pub fn stop() -> Self {
        Self::new(
            "stop",
            "Stop",
            "Stop the resource and mark it failed",
            true,
        )
    }

    pub fn kill() -> Self {
        Self::new(
            "kill",
            "Kill",
            "Forcefully terminate the resource and mark it failed",
            true,
        )
    }

    /// Options offered when a strategy adds none of its own
    pub fn defaults() -> Vec<Self> {
        vec![Self::retry(), Self::stop(), Self::kill()]
    }
}

/// How a request was closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionResolution {
    pub option_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl InterventionResolution {
    /// Option id recorded when a resource terminated on its own
    pub const SUPERSEDED: &'static str = "superseded";
}

/// Operator request raised once automatic recovery is exhausted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInterventionRequest {
    pub id: RequestId,
    pub resource_id: ResourceId,
    pub resource_type: String,
    pub failure_context: FailureContext,
    pub attempted_tiers: Vec<u32>,
    pub options: Vec<InterventionOption>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<InterventionResolution>,
}

impl UserInterventionRequest {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }

    pub fn option(&self, option_id: &str) -> Option<&InterventionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

//! Immutable state transition records

use super::{ResourceId, ResourceState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One applied lifecycle edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub resource_id: ResourceId,
    pub from: ResourceState,
    pub to: ResourceState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl StateTransition {
    pub fn new(
        resource_id: impl Into<ResourceId>,
        from: ResourceState,
        to: ResourceState,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            from,
            to,
            timestamp,
            reason: reason.into(),
        }
    }
}

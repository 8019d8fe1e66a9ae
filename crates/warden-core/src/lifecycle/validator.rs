//! Legal lifecycle edges

use crate::error::{WardenError, WardenResult};
use crate::types::ResourceState;

/// Pure check of the lifecycle graph
///
/// ```text
/// idle -> running
/// running -> stuck | completed | failed
/// stuck -> recovering | failed | completed
/// recovering -> running | stuck | failed | completed
/// ```
///
/// `completed` and `failed` are terminal. The `* -> completed` edges out of
/// `stuck` and `recovering` are only taken by an owner's own completion signal.
pub struct TransitionValidator;

impl TransitionValidator {
    /// Whether `from -> to` is a legal edge
    pub fn is_allowed(from: ResourceState, to: ResourceState) -> bool {
        use ResourceState::*;

        matches!(
            (from, to),
            (Idle, Running)
                | (Running, Stuck)
                | (Running, Completed)
                | (Running, Failed)
                | (Stuck, Recovering)
                | (Stuck, Failed)
                | (Stuck, Completed)
                | (Recovering, Running)
                | (Recovering, Stuck)
                | (Recovering, Failed)
                | (Recovering, Completed)
        )
    }

    /// Check an edge for a resource
    pub fn validate(resource_id: &str, from: ResourceState, to: ResourceState) -> WardenResult<()> {
        if Self::is_allowed(from, to) {
            Ok(())
        } else {
            Err(WardenError::invalid_transition(resource_id, from, to))
        }
    }

    /// Every state reachable in one step from `from`
    pub fn targets(from: ResourceState) -> Vec<ResourceState> {
        ResourceState::ALL
            .into_iter()
            .filter(|to| Self::is_allowed(from, *to))
            .collect()
    }
}

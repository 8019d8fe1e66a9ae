//! Constructor methods for WardenError

use super::types::WardenError;
use crate::types::ResourceState;

impl WardenError {
    /// Unknown resource id
    pub fn resource_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Resource",
            id: id.into(),
        }
    }

    /// Unknown intervention request id
    pub fn intervention_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Intervention",
            id: id.into(),
        }
    }

    /// Illegal lifecycle edge
    pub fn invalid_transition(
        resource_id: impl Into<String>,
        from: ResourceState,
        to: ResourceState,
    ) -> Self {
        Self::InvalidTransition {
            resource_id: resource_id.into(),
            from,
            to,
        }
    }

    /// Failed or timed out recovery action
    pub fn recovery_failed(resource_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecoveryActionFailed {
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }

    /// Resource type without a registered strategy
    pub fn strategy_not_registered(resource_type: impl Into<String>) -> Self {
        Self::StrategyNotRegistered {
            resource_type: resource_type.into(),
        }
    }

    /// Invalid caller input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }
}

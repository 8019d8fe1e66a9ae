//! Core error types for Warden

use crate::types::ResourceState;
use thiserror::Error;

/// Result type alias for supervisor operations
pub type WardenResult<T> = Result<T, WardenError>;

/// Main error type for the supervisor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WardenError {
    /// Unknown resource or intervention request
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Requested state edge is not part of the lifecycle graph
    #[error("Invalid transition for {resource_id}: {from} -> {to}")]
    InvalidTransition {
        resource_id: String,
        from: ResourceState,
        to: ResourceState,
    },

    /// Intervention request was already resolved
    #[error("Intervention {request_id} is already resolved")]
    InterventionAlreadyResolved { request_id: String },

    /// Option id is not offered by the intervention request
    #[error("Intervention {request_id} has no option '{option_id}'")]
    InvalidOption {
        request_id: String,
        option_id: String,
    },

    /// Strategy action failed or exceeded its tier deadline
    #[error("Recovery action failed for {resource_id}: {message}")]
    RecoveryActionFailed {
        resource_id: String,
        message: String,
    },

    /// No strategy registered for the resource type
    #[error("No recovery strategy registered for resource type '{resource_type}'")]
    StrategyNotRegistered { resource_type: String },

    /// A recovery attempt is already running for the resource
    #[error("Recovery already in flight for {resource_id}")]
    RecoveryInFlight { resource_id: String },

    /// Resource must be terminal for the requested operation
    #[error("Resource {resource_id} is not terminal (state: {state})")]
    NotTerminal {
        resource_id: String,
        state: ResourceState,
    },

    /// Invalid caller input
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Storage/persistence errors
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl WardenError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "WARDEN_NOT_FOUND",
            Self::InvalidTransition { .. } => "WARDEN_INVALID_TRANSITION",
            Self::InterventionAlreadyResolved { .. } => "WARDEN_ALREADY_RESOLVED",
            Self::InvalidOption { .. } => "WARDEN_INVALID_OPTION",
            Self::RecoveryActionFailed { .. } => "WARDEN_RECOVERY_FAILED",
            Self::StrategyNotRegistered { .. } => "WARDEN_NO_STRATEGY",
            Self::RecoveryInFlight { .. } => "WARDEN_RECOVERY_IN_FLIGHT",
            Self::NotTerminal { .. } => "WARDEN_NOT_TERMINAL",
            Self::InvalidInput { .. } => "WARDEN_INVALID_INPUT",
            Self::Config { .. } => "WARDEN_CONFIG",
            Self::Persistence { .. } => "WARDEN_PERSISTENCE",
        }
    }

    /// Whether the error is a caller mistake rather than a supervisor fault
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::RecoveryActionFailed { .. } | Self::Persistence { .. }
        )
    }
}

/// Error returned by a [`RecoveryStrategy`](crate::recovery::RecoveryStrategy)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The action ran and failed
    #[error("{0}")]
    Failed(String),

    /// The strategy does not know the tier action
    #[error("unsupported recovery action '{0}'")]
    UnsupportedAction(String),

    /// The strategy does not know the intervention option
    #[error("unsupported directive '{0}'")]
    UnsupportedDirective(String),
}

impl StrategyError {
    /// Create a failure error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

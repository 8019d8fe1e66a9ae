//! Data model shared by every supervisor component

mod intervention;
mod resource;
mod tier;
mod transition;

pub use intervention::{
    Directive, FailureContext, InterventionOption, InterventionResolution, RequestId,
    UserInterventionRequest,
};
pub use resource::{Resource, ResourceConfig, ResourceId, ResourceState};
pub use tier::{RecoveryAction, RecoveryPolicy, RecoveryTier};
pub use transition::StateTransition;

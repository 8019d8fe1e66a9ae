//! Error types for Warden
//!
//! Every fallible supervisor operation returns [`WardenResult`]. Errors are
//! returned to the caller and never abort the health monitor:
//! - `NotFound`: unknown resource or intervention id
//! - `InvalidTransition`: the requested edge is not in the lifecycle graph
//! - `InterventionAlreadyResolved`: double resolution of a request
//! - `RecoveryActionFailed`: a strategy action failed or timed out (engine internal)
//! - `StrategyNotRegistered`: no recovery strategy for a resource type

mod constructors;
mod types;

pub use types::{StrategyError, WardenError, WardenResult};

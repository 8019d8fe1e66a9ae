//! Tiered recovery
//!
//! Strategies perform the actual restart/stop/kill work for a resource type.
//! The engine picks the tier, bounds it with the tier timeout and applies the
//! result to the resource.

mod engine;
mod scripted;
mod strategy;
mod strategy_registry;

pub use engine::{DispatchMode, DispatchOutcome, RecoveryEngine};
pub use scripted::{ScriptStep, ScriptedStrategy, StrategyCall};
pub use strategy::{NoopStrategy, RecoveryStrategy};
#[cfg(test)]
pub use strategy::MockRecoveryStrategy;
pub use strategy_registry::{RecoveryStrategyRegistry, RegisteredStrategy};

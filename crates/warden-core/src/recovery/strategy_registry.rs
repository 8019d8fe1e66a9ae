//! Strategy and policy lookup by resource type

use super::strategy::{NoopStrategy, RecoveryStrategy};
use crate::error::WardenResult;
use crate::types::RecoveryPolicy;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Strategy and escalation ladder registered for one resource type
pub struct RegisteredStrategy {
    pub policy: RecoveryPolicy,
    pub strategy: Arc<dyn RecoveryStrategy>,
}

impl std::fmt::Debug for RegisteredStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredStrategy")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Maps resource types to their recovery strategy and policy
pub struct RecoveryStrategyRegistry {
    strategies: DashMap<String, Arc<RegisteredStrategy>>,
    /// Timeouts for configured types that have no strategy
    timeouts: DashMap<String, Duration>,
    noop: Arc<dyn RecoveryStrategy>,
    default_heartbeat_timeout: Duration,
}

impl RecoveryStrategyRegistry {
    pub fn new(default_heartbeat_timeout: Duration) -> Self {
        Self {
            strategies: DashMap::new(),
            timeouts: DashMap::new(),
            noop: Arc::new(NoopStrategy),
            default_heartbeat_timeout,
        }
    }

    /// Register or replace the strategy for `resource_type`
    pub fn register(
        &self,
        resource_type: impl Into<String>,
        policy: RecoveryPolicy,
        strategy: Arc<dyn RecoveryStrategy>,
    ) -> WardenResult<()> {
        let resource_type = resource_type.into();
        policy.validate(&resource_type)?;

        tracing::debug!(
            resource_type = %resource_type,
            tiers = policy.tiers.len(),
            budget = policy.budget(),
            "recovery strategy registered"
        );
        self.strategies
            .insert(resource_type, Arc::new(RegisteredStrategy { policy, strategy }));
        Ok(())
    }

    pub fn get(&self, resource_type: &str) -> Option<Arc<RegisteredStrategy>> {
        self.strategies.get(resource_type).map(|e| e.value().clone())
    }

    /// Registered strategy, or one that does nothing for unknown types
    pub fn strategy_or_noop(&self, resource_type: &str) -> Arc<dyn RecoveryStrategy> {
        self.get(resource_type)
            .map(|registered| registered.strategy.clone())
            .unwrap_or_else(|| self.noop.clone())
    }

    pub fn policy(&self, resource_type: &str) -> Option<RecoveryPolicy> {
        self.get(resource_type).map(|r| r.policy.clone())
    }

    /// Staleness threshold for a type that is tracked without a strategy
    pub fn set_heartbeat_timeout(&self, resource_type: impl Into<String>, timeout: Duration) {
        self.timeouts.insert(resource_type.into(), timeout);
    }

    /// Heartbeat timeout for the type, falling back to the global default
    pub fn heartbeat_timeout(&self, resource_type: &str) -> Duration {
        if let Some(registered) = self.strategies.get(resource_type) {
            return registered.value().policy.heartbeat_timeout;
        }
        self.timeouts
            .get(resource_type)
            .map(|e| *e.value())
            .unwrap_or(self.default_heartbeat_timeout)
    }

    pub fn unregister(&self, resource_type: &str) -> bool {
        self.strategies.remove(resource_type).is_some()
    }

    /// Registered resource types, sorted
    pub fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.strategies.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for RecoveryStrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryStrategyRegistry")
            .field("resource_types", &self.resource_types())
            .field("default_heartbeat_timeout", &self.default_heartbeat_timeout)
            .finish()
    }
}

//! Builder for assembling a supervisor

use super::Supervisor;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigValidator, SupervisorConfig};
use crate::error::{WardenError, WardenResult};
use crate::events::EventBus;
use crate::intervention::InterventionManager;
use crate::lifecycle::{HistoryLog, ResourceRegistry};
use crate::monitor::HealthMonitor;
use crate::persistence::HistorySink;
use crate::recovery::{RecoveryEngine, RecoveryStrategy, RecoveryStrategyRegistry};
use crate::types::RecoveryPolicy;
use std::sync::Arc;

/// Builder for creating supervisors with a fluent API
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    clock: Option<Arc<dyn Clock>>,
    history_sink: Option<Arc<dyn HistorySink>>,
    strategies: Vec<(String, Option<RecoveryPolicy>, Arc<dyn RecoveryStrategy>)>,
}

impl SupervisorBuilder {
    /// Create a new builder with configuration
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            clock: None,
            history_sink: None,
            strategies: Vec::new(),
        }
    }

    /// Use a custom time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Forward every transition to a durable sink
    ///
    /// The sink writer task is spawned by [`build`](Self::build), which must
    /// then run inside a tokio runtime.
    pub fn with_history_sink(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history_sink = Some(sink);
        self
    }

    /// Register a strategy whose policy comes from `config.types`
    pub fn with_strategy(
        mut self,
        resource_type: impl Into<String>,
        strategy: Arc<dyn RecoveryStrategy>,
    ) -> Self {
        self.strategies.push((resource_type.into(), None, strategy));
        self
    }

    /// Register a strategy with an explicit policy
    pub fn with_policy_and_strategy(
        mut self,
        resource_type: impl Into<String>,
        policy: RecoveryPolicy,
        strategy: Arc<dyn RecoveryStrategy>,
    ) -> Self {
        self.strategies.push((resource_type.into(), Some(policy), strategy));
        self
    }

    /// Build the supervisor; the health monitor is not started
    pub fn build(self) -> WardenResult<Supervisor> {
        ConfigValidator::validate(&self.config)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let events = EventBus::new(self.config.event_capacity);
        let history = Arc::new(match self.history_sink {
            Some(sink) => HistoryLog::with_sink(sink),
            None => HistoryLog::new(),
        });

        let registry = Arc::new(ResourceRegistry::new(
            history,
            events.clone(),
            clock.clone(),
        ));

        let strategies = Arc::new(RecoveryStrategyRegistry::new(
            self.config.default_heartbeat_timeout,
        ));
        for (resource_type, policy) in &self.config.types {
            strategies.set_heartbeat_timeout(resource_type.clone(), policy.heartbeat_timeout);
        }
        for (resource_type, policy, strategy) in self.strategies {
            let policy = match policy.or_else(|| self.config.policy(&resource_type).cloned()) {
                Some(policy) => policy,
                None => {
                    return Err(WardenError::config_with_context(
                        "no recovery policy configured",
                        format!("resource type '{}'", resource_type),
                    ));
                }
            };
            strategies.register(resource_type, policy, strategy)?;
        }

        let interventions = Arc::new(InterventionManager::new(events.clone(), clock.clone()));
        let engine = Arc::new(RecoveryEngine::new(
            registry.clone(),
            strategies.clone(),
            interventions.clone(),
            events.clone(),
            self.config.max_concurrent_recoveries,
        ));
        let monitor = Arc::new(HealthMonitor::new(
            registry.clone(),
            strategies.clone(),
            engine.clone(),
            interventions.clone(),
            events.clone(),
            clock.clone(),
            self.config.tick_interval,
            self.config.terminal_retention,
        ));

        tracing::debug!(
            tick_interval = ?self.config.tick_interval,
            max_concurrent_recoveries = self.config.max_concurrent_recoveries,
            resource_types = ?strategies.resource_types(),
            "supervisor built"
        );

        Ok(Supervisor {
            config: self.config,
            clock,
            events,
            registry,
            strategies,
            interventions,
            engine,
            monitor,
        })
    }
}

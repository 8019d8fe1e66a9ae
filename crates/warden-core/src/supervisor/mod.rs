//! Supervisor facade
//!
//! [`Supervisor`] is the explicit handle that owns the registry, recovery
//! engine, intervention queue and health monitor. Resource owners use the
//! lifecycle calls below; operator calls live in `operator.rs`.

mod builder;
mod operator;

#[cfg(test)]
mod tests;

pub use builder::SupervisorBuilder;

use crate::clock::Clock;
use crate::config::SupervisorConfig;
use crate::error::{WardenError, WardenResult};
use crate::events::{EventBus, SupervisorEvent};
use crate::intervention::InterventionManager;
use crate::lifecycle::ResourceRegistry;
use crate::monitor::{HealthMonitor, StatsAggregator, SupervisorStats, TickReport};
use crate::recovery::{RecoveryEngine, RecoveryStrategy, RecoveryStrategyRegistry};
use crate::types::{
    RecoveryPolicy, Resource, ResourceConfig, ResourceId, ResourceState, StateTransition,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Watches resource heartbeats, drives tiered recovery and queues operator
/// interventions
pub struct Supervisor {
    config: SupervisorConfig,
    clock: Arc<dyn Clock>,
    events: EventBus,
    registry: Arc<ResourceRegistry>,
    strategies: Arc<RecoveryStrategyRegistry>,
    interventions: Arc<InterventionManager>,
    engine: Arc<RecoveryEngine>,
    monitor: Arc<HealthMonitor>,
}

impl Supervisor {
    /// Supervisor with the system clock and no strategies
    pub fn new(config: SupervisorConfig) -> WardenResult<Self> {
        SupervisorBuilder::new(config).build()
    }

    pub fn builder(config: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(config)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Register or replace the strategy for a resource type at runtime
    pub fn register_strategy(
        &self,
        resource_type: impl Into<String>,
        policy: RecoveryPolicy,
        strategy: Arc<dyn RecoveryStrategy>,
    ) -> WardenResult<()> {
        self.strategies.register(resource_type, policy, strategy)
    }

    /// Track a new resource
    pub fn spawn_resource(
        &self,
        resource_type: &str,
        config: ResourceConfig,
    ) -> WardenResult<ResourceId> {
        self.registry.spawn(resource_type, config)
    }

    /// Start a resource spawned with `auto_start` off
    pub fn start_resource(&self, id: &str) -> WardenResult<StateTransition> {
        self.registry.start(id)
    }

    pub fn record_heartbeat(&self, id: &str) -> WardenResult<()> {
        self.registry.heartbeat(id)
    }

    pub fn update_progress(
        &self,
        id: &str,
        progress: Option<f32>,
        substate: Option<String>,
    ) -> WardenResult<()> {
        self.registry.update_progress(id, progress, substate)
    }

    /// Owner signal: work finished
    ///
    /// Any in-flight recovery is cancelled under the resource lock together
    /// with the transition, and an open intervention is closed as superseded.
    pub fn complete(&self, id: &str) -> WardenResult<StateTransition> {
        let transition = self.registry.complete_with(id, |_| {
            self.engine.cancel(id);
        })?;
        self.interventions.supersede(id);
        Ok(transition)
    }

    /// Owner signal: work failed on its own
    pub fn fail_naturally(&self, id: &str, error: &str) -> WardenResult<StateTransition> {
        let transition = self.registry.fail_naturally_with(id, error, |_| {
            self.engine.cancel(id);
        })?;
        self.interventions.supersede(id);
        Ok(transition)
    }

    pub fn list_all(&self) -> Vec<Resource> {
        self.registry.list_all()
    }

    pub fn list_by_type(&self, resource_type: &str) -> Vec<Resource> {
        self.registry.list_by_type(resource_type)
    }

    pub fn list_stuck(&self) -> Vec<Resource> {
        self.registry.list_stuck()
    }

    pub fn list_in_state(&self, state: ResourceState) -> Vec<Resource> {
        self.registry.list_in_state(state)
    }

    pub fn get_resource_status(&self, id: &str) -> WardenResult<Resource> {
        self.registry.get(id)
    }

    /// Transitions of a resource in the order they were applied
    ///
    /// History outlives removal of the resource record.
    pub fn get_resource_history(&self, id: &str) -> WardenResult<Vec<StateTransition>> {
        if !self.registry.contains(id) && !self.registry.history().contains(id) {
            return Err(WardenError::resource_not_found(id));
        }
        Ok(self.registry.history().history(id))
    }

    /// Drop a terminal resource record
    pub fn remove_resource(&self, id: &str) -> WardenResult<Resource> {
        self.registry.remove(id)
    }

    pub fn get_stats(&self) -> SupervisorStats {
        StatsAggregator::collect(&self.registry.list_all(), self.interventions.pending_count())
    }

    pub fn is_recovery_in_flight(&self, id: &str) -> bool {
        self.engine.is_in_flight(id)
    }

    /// Run one health-monitor pass immediately
    pub fn tick(&self) -> TickReport {
        self.monitor.tick()
    }

    /// Start the periodic health monitor; false if already running
    ///
    /// After [`shutdown`](Self::shutdown) this also lets the recovery engine
    /// accept attempts again.
    pub fn start(&self) -> bool {
        self.engine.resume();
        self.monitor.start()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    /// Stop the monitor, cancel recoveries and flush history to the sink
    ///
    /// Resources whose attempt was cancelled go back to `stuck` so a later
    /// [`start`](Self::start) or restore picks them up again.
    pub async fn shutdown(&self) {
        self.monitor.stop().await;
        self.engine.shutdown();
        let interrupted = self
            .registry
            .interrupt_recoveries("recovery interrupted by supervisor shutdown");
        self.registry.history().flush().await;
        tracing::info!(
            resources = self.registry.len(),
            interrupted,
            "supervisor shut down"
        );
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("registry", &self.registry)
            .field("strategies", &self.strategies)
            .field("engine", &self.engine)
            .field("monitor", &self.monitor)
            .finish()
    }
}

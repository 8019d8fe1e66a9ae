//! Periodic heartbeat watchdog

use crate::clock::Clock;
use crate::events::{EventBus, SupervisorEvent};
use crate::intervention::InterventionManager;
use crate::lifecycle::ResourceRegistry;
use crate::recovery::{DispatchMode, DispatchOutcome, RecoveryEngine, RecoveryStrategyRegistry};
use crate::types::{Resource, ResourceState};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What a single monitor pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub scanned: usize,
    pub marked_stuck: usize,
    pub dispatched: usize,
    pub interventions_opened: usize,
    pub pruned: usize,
}

struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Detects stale heartbeats and hands stuck resources to the recovery engine
///
/// A tick never awaits a recovery action; dispatch only spawns the attempt.
pub struct HealthMonitor {
    registry: Arc<ResourceRegistry>,
    strategies: Arc<RecoveryStrategyRegistry>,
    engine: Arc<RecoveryEngine>,
    interventions: Arc<InterventionManager>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    terminal_retention: Option<Duration>,
    handle: Mutex<Option<MonitorHandle>>,
}

impl HealthMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ResourceRegistry>,
        strategies: Arc<RecoveryStrategyRegistry>,
        engine: Arc<RecoveryEngine>,
        interventions: Arc<InterventionManager>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
        terminal_retention: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            strategies,
            engine,
            interventions,
            events,
            clock,
            tick_interval,
            terminal_retention,
            handle: Mutex::new(None),
        }
    }

    /// Run one monitor pass
    ///
    /// Per-resource failures are logged and never abort the pass.
    pub fn tick(&self) -> TickReport {
        let now = self.clock.now();
        let resources = self.registry.list_all();
        let mut report = TickReport {
            scanned: resources.len(),
            ..Default::default()
        };

        for resource in &resources {
            match resource.state {
                ResourceState::Running => {
                    if self.mark_if_stale(resource) {
                        report.marked_stuck += 1;
                        self.try_recover(&resource.id, &mut report);
                    }
                }
                ResourceState::Stuck => self.try_recover(&resource.id, &mut report),
                ResourceState::Completed | ResourceState::Failed => {
                    if self.should_prune(resource, now) {
                        match self.registry.remove(&resource.id) {
                            Ok(_) => report.pruned += 1,
                            Err(e) => {
                                tracing::debug!(resource_id = %resource.id, error = %e, "prune skipped")
                            }
                        }
                    }
                }
                ResourceState::Idle | ResourceState::Recovering => {}
            }
        }

        if report.marked_stuck > 0 || report.dispatched > 0 || report.interventions_opened > 0 {
            tracing::info!(
                scanned = report.scanned,
                marked_stuck = report.marked_stuck,
                dispatched = report.dispatched,
                interventions_opened = report.interventions_opened,
                pruned = report.pruned,
                "monitor tick"
            );
        } else {
            tracing::trace!(scanned = report.scanned, pruned = report.pruned, "monitor tick");
        }
        report
    }

    /// Re-check staleness under the resource lock and apply `running -> stuck`
    fn mark_if_stale(&self, snapshot: &Resource) -> bool {
        let timeout = self.strategies.heartbeat_timeout(&snapshot.resource_type);
        let result = self.registry.with_resource(&snapshot.id, |resource| {
            let now = self.clock.now();
            if resource.state != ResourceState::Running || !resource.is_stale(now, timeout) {
                return Ok(false);
            }
            let silent_for = (now - resource.last_heartbeat_at).num_seconds().max(0);
            let reason = format!(
                "heartbeat timeout: silent for {}s (limit {}s)",
                silent_for,
                timeout.as_secs()
            );
            self.registry
                .apply_transition(resource, ResourceState::Stuck, reason.clone())?;
            resource.last_error = Some(reason);
            Ok(true)
        });

        match result {
            Ok(marked) => marked,
            Err(e) => {
                tracing::warn!(resource_id = %snapshot.id, error = %e, "staleness check failed");
                false
            }
        }
    }

    fn try_recover(&self, id: &str, report: &mut TickReport) {
        if self.engine.is_in_flight(id) || self.interventions.has_open(id) {
            return;
        }
        match self.engine.dispatch(id, DispatchMode::Automatic) {
            Ok(DispatchOutcome::Dispatched { .. }) => report.dispatched += 1,
            Ok(DispatchOutcome::AwaitingOperator(_)) => report.interventions_opened += 1,
            Ok(DispatchOutcome::AlreadyInFlight | DispatchOutcome::Skipped) => {}
            Err(e) => tracing::warn!(resource_id = %id, error = %e, "recovery dispatch failed"),
        }
    }

    fn should_prune(&self, resource: &Resource, now: chrono::DateTime<chrono::Utc>) -> bool {
        let Some(retention) = self.terminal_retention else {
            return false;
        };
        match (now - resource.updated_at).to_std() {
            Ok(age) => age > retention,
            Err(_) => false,
        }
    }

    /// Start the periodic loop; returns false if it is already running
    ///
    /// The loop holds only a weak reference, so dropping the last handle to
    /// the monitor ends it as well.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let monitor = Arc::downgrade(self);
        let period = self.tick_interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(monitor) = monitor.upgrade() else { break };
                        monitor.tick();
                    }
                }
            }
        });

        *handle = Some(MonitorHandle { cancel, task });
        tracing::info!(tick_interval = ?self.tick_interval, "health monitor started");
        self.events.publish(SupervisorEvent::MonitorStarted);
        true
    }

    /// Stop the loop and wait for it to exit
    pub async fn stop(&self) {
        let handle = self.handle.lock().take();
        if let Some(MonitorHandle { cancel, task }) = handle {
            cancel.cancel();
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "health monitor task ended abnormally");
            }
            tracing::info!("health monitor stopped");
            self.events.publish(SupervisorEvent::MonitorStopped);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.task.is_finished())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("tick_interval", &self.tick_interval)
            .field("terminal_retention", &self.terminal_retention)
            .field("running", &self.is_running())
            .finish()
    }
}

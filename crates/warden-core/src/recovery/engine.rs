//! Recovery dispatch and result application

use super::strategy::RecoveryStrategy;
use super::strategy_registry::{RecoveryStrategyRegistry, RegisteredStrategy};
use crate::error::{WardenError, WardenResult};
use crate::events::{EventBus, SupervisorEvent};
use crate::intervention::InterventionManager;
use crate::lifecycle::ResourceRegistry;
use crate::types::{
    FailureContext, InterventionOption, RecoveryTier, RequestId, Resource, ResourceId,
    ResourceState,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Who asked for a recovery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Health monitor; respects the escalation budget
    Automatic,
    /// Operator retry; runs the current tier even past the budget
    Manual,
}

/// Result of a dispatch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An attempt was started in the background
    Dispatched { tier: u32, attempt: u32 },
    /// Automatic recovery is exhausted; the request waits for an operator
    AwaitingOperator(RequestId),
    /// Another attempt for the resource is still running
    AlreadyInFlight,
    /// The resource is no longer eligible (state moved on or engine stopped)
    Skipped,
}

#[derive(Debug)]
struct InFlight {
    attempt_id: u64,
    token: CancellationToken,
}

enum Prepared {
    Run {
        tier: RecoveryTier,
        attempt: u32,
        snapshot: Resource,
    },
    Outcome(DispatchOutcome),
}

/// Runs recovery attempts on a bounded worker pool
///
/// At most one attempt is in flight per resource id. Each attempt owns a
/// child token of the engine's root token, so cancelling a resource or
/// shutting down the engine stops it at the next await point. A shut-down
/// engine accepts work again after [`resume`](Self::resume).
pub struct RecoveryEngine {
    registry: Arc<ResourceRegistry>,
    strategies: Arc<RecoveryStrategyRegistry>,
    interventions: Arc<InterventionManager>,
    events: EventBus,
    in_flight: DashMap<ResourceId, InFlight>,
    permits: Arc<Semaphore>,
    root: Mutex<CancellationToken>,
    next_attempt: AtomicU64,
}

impl RecoveryEngine {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        strategies: Arc<RecoveryStrategyRegistry>,
        interventions: Arc<InterventionManager>,
        events: EventBus,
        max_concurrent: usize,
    ) -> Self {
        Self {
            registry,
            strategies,
            interventions,
            events,
            in_flight: DashMap::new(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            root: Mutex::new(CancellationToken::new()),
            next_attempt: AtomicU64::new(1),
        }
    }

    /// Start a recovery attempt for a `stuck` resource
    ///
    /// Returns as soon as the attempt is spawned; the strategy action runs on
    /// the worker pool. Must be called from within a tokio runtime.
    pub fn dispatch(self: &Arc<Self>, id: &str, mode: DispatchMode) -> WardenResult<DispatchOutcome> {
        let Some(token) = self.attempt_token() else {
            return Ok(DispatchOutcome::Skipped);
        };

        let resource_type = self.registry.get(id)?.resource_type;
        let Some(registered) = self.strategies.get(&resource_type) else {
            return match mode {
                DispatchMode::Manual => Err(WardenError::strategy_not_registered(resource_type)),
                DispatchMode::Automatic => self.escalate_unmanaged(id, &resource_type),
            };
        };

        let attempt_id = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        match self.in_flight.entry(id.to_string()) {
            Entry::Occupied(_) => {
                return match mode {
                    DispatchMode::Automatic => Ok(DispatchOutcome::AlreadyInFlight),
                    DispatchMode::Manual => Err(WardenError::RecoveryInFlight {
                        resource_id: id.to_string(),
                    }),
                };
            }
            Entry::Vacant(slot) => {
                slot.insert(InFlight {
                    attempt_id,
                    token: token.clone(),
                });
            }
        }

        let prepared = self
            .registry
            .with_resource(id, |resource| self.prepare(resource, &registered, mode, &token));

        let (tier, attempt, snapshot) = match prepared {
            Ok(Prepared::Run {
                tier,
                attempt,
                snapshot,
            }) => (tier, attempt, snapshot),
            Ok(Prepared::Outcome(outcome)) => {
                self.release(id, attempt_id);
                return Ok(outcome);
            }
            Err(e) => {
                self.release(id, attempt_id);
                return Err(e);
            }
        };

        tracing::info!(
            resource_id = %id,
            tier = tier.ordinal,
            action = %tier.action,
            attempt,
            timeout = ?tier.timeout,
            "recovery dispatched"
        );
        self.events.publish(SupervisorEvent::RecoveryDispatched {
            resource_id: id.to_string(),
            tier: tier.ordinal,
            attempt,
        });

        let ordinal = tier.ordinal;
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine
                .run_attempt(snapshot, registered, tier, attempt_id, token)
                .await;
        });

        Ok(DispatchOutcome::Dispatched {
            tier: ordinal,
            attempt,
        })
    }

    /// Decide and apply `stuck -> recovering` on a locked resource
    fn prepare(
        &self,
        resource: &mut Resource,
        registered: &RegisteredStrategy,
        mode: DispatchMode,
        token: &CancellationToken,
    ) -> WardenResult<Prepared> {
        // Cancelled between reservation and lock: a terminal signal or shutdown won
        if token.is_cancelled() {
            return Ok(Prepared::Outcome(DispatchOutcome::Skipped));
        }
        if resource.state != ResourceState::Stuck {
            return match mode {
                DispatchMode::Automatic => Ok(Prepared::Outcome(DispatchOutcome::Skipped)),
                DispatchMode::Manual => Err(WardenError::invalid_transition(
                    &resource.id,
                    resource.state,
                    ResourceState::Recovering,
                )),
            };
        }

        if mode == DispatchMode::Automatic {
            if let Some(open) = self.interventions.open_for(&resource.id) {
                return Ok(Prepared::Outcome(DispatchOutcome::AwaitingOperator(open.id)));
            }
            if registered.policy.is_exhausted(resource.escalation_tier) {
                let error = resource
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "recovery tiers exhausted".to_string());
                let options = registered.strategy.intervention_options(resource);
                let request_id = self.open_intervention(resource, error, options);
                return Ok(Prepared::Outcome(DispatchOutcome::AwaitingOperator(request_id)));
            }
        }

        let tier = registered
            .policy
            .tier_for_step(resource.escalation_tier)
            .cloned()
            .ok_or_else(|| {
                WardenError::config_with_context(
                    "no recovery tiers configured",
                    format!("resource type '{}'", resource.resource_type),
                )
            })?;

        self.registry.apply_transition(
            resource,
            ResourceState::Recovering,
            format!("recovery tier {} ({})", tier.ordinal, tier.action),
        )?;
        resource.recovery_attempts += 1;
        resource.attempted_tiers.push(tier.ordinal);

        Ok(Prepared::Run {
            tier,
            attempt: resource.recovery_attempts,
            snapshot: resource.clone(),
        })
    }

    /// Resources without a strategy go straight to the operator
    fn escalate_unmanaged(&self, id: &str, resource_type: &str) -> WardenResult<DispatchOutcome> {
        self.registry.with_resource(id, |resource| {
            if resource.state != ResourceState::Stuck {
                return Ok(DispatchOutcome::Skipped);
            }
            let error = WardenError::strategy_not_registered(resource_type).to_string();
            tracing::warn!(resource_id = %id, resource_type, "automatic recovery skipped: no strategy");
            let request_id = self.open_intervention(
                resource,
                error,
                vec![InterventionOption::stop(), InterventionOption::kill()],
            );
            Ok(DispatchOutcome::AwaitingOperator(request_id))
        })
    }

    /// Open (or return) the intervention for a locked, exhausted resource
    fn open_intervention(
        &self,
        resource: &Resource,
        error: String,
        options: Vec<InterventionOption>,
    ) -> RequestId {
        let now = self.registry.now();
        let last_state = self
            .registry
            .history()
            .last(&resource.id)
            .map(|t| t.from)
            .unwrap_or(resource.state);
        let failure_context = FailureContext {
            error,
            recovery_attempts: resource.recovery_attempts,
            running_duration_secs: resource.running_duration_secs(now),
            last_state,
            failed_at: now,
        };
        let (request, _created) = self.interventions.open_if_absent(
            resource,
            failure_context,
            resource.attempted_tiers.clone(),
            options,
        );
        request.id
    }

    async fn run_attempt(
        self: Arc<Self>,
        resource: Resource,
        registered: Arc<RegisteredStrategy>,
        tier: RecoveryTier,
        attempt_id: u64,
        token: CancellationToken,
    ) {
        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            tracing::debug!(resource_id = %resource.id, "recovery cancelled before start");
            self.release(&resource.id, attempt_id);
            return;
        };

        let strategy: &dyn RecoveryStrategy = registered.strategy.as_ref();
        let action = AssertUnwindSafe(strategy.recover(&resource, &tier)).catch_unwind();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = tokio::time::timeout(tier.timeout, action) => Some(result),
        };
        drop(permit);

        let result = match outcome {
            None => {
                tracing::debug!(resource_id = %resource.id, tier = tier.ordinal, "recovery cancelled");
                self.release(&resource.id, attempt_id);
                return;
            }
            Some(Err(_elapsed)) => Err(format!(
                "tier {} ({}) timed out after {:?}",
                tier.ordinal, tier.action, tier.timeout
            )),
            Some(Ok(Err(panic))) => Err(format!(
                "tier {} ({}) panicked: {}",
                tier.ordinal,
                tier.action,
                panic_message(panic.as_ref())
            )),
            Some(Ok(Ok(Err(e)))) => Err(format!("tier {} ({}) failed: {}", tier.ordinal, tier.action, e)),
            Some(Ok(Ok(Ok(())))) => Ok(()),
        };

        self.finish_attempt(&resource.id, &registered, &tier, attempt_id, &token, result);
    }

    /// Apply an attempt's result unless it was cancelled or superseded
    fn finish_attempt(
        &self,
        id: &str,
        registered: &RegisteredStrategy,
        tier: &RecoveryTier,
        attempt_id: u64,
        token: &CancellationToken,
        result: Result<(), String>,
    ) {
        let applied = self.registry.with_resource(id, |resource| {
            let outcome = self.apply_result(resource, registered, tier, attempt_id, token, result);
            // Released under the resource lock so no dispatch sees a stale guard
            self.release(id, attempt_id);
            outcome
        });

        match applied {
            Ok(Some(success)) => {
                self.events.publish(SupervisorEvent::RecoveryFinished {
                    resource_id: id.to_string(),
                    tier: tier.ordinal,
                    success,
                });
            }
            Ok(None) => {
                tracing::debug!(resource_id = %id, tier = tier.ordinal, "stale recovery result discarded");
            }
            Err(e) => {
                self.release(id, attempt_id);
                tracing::warn!(resource_id = %id, error = %e, "recovery result not applied");
            }
        }
    }

    fn apply_result(
        &self,
        resource: &mut Resource,
        registered: &RegisteredStrategy,
        tier: &RecoveryTier,
        attempt_id: u64,
        token: &CancellationToken,
        result: Result<(), String>,
    ) -> WardenResult<Option<bool>> {
        let current = self
            .in_flight
            .get(&resource.id)
            .map(|f| f.attempt_id == attempt_id)
            .unwrap_or(false);
        if token.is_cancelled() || !current || resource.state != ResourceState::Recovering {
            return Ok(None);
        }

        match result {
            Ok(()) => {
                let transition = self.registry.apply_transition(
                    resource,
                    ResourceState::Running,
                    format!("recovered by tier {} ({})", tier.ordinal, tier.action),
                )?;
                resource.escalation_tier = 0;
                resource.attempted_tiers.clear();
                resource.last_error = None;
                resource.last_heartbeat_at = transition.timestamp;
                tracing::info!(resource_id = %resource.id, tier = tier.ordinal, "recovery succeeded");
                Ok(Some(true))
            }
            Err(message) => {
                self.registry
                    .apply_transition(resource, ResourceState::Stuck, message.clone())?;
                resource.escalation_tier = resource.escalation_tier.saturating_add(1);
                let error = WardenError::recovery_failed(&resource.id, message.clone());
                tracing::warn!(
                    resource_id = %resource.id,
                    tier = tier.ordinal,
                    escalation_tier = resource.escalation_tier,
                    error = %error,
                    "recovery attempt failed"
                );
                resource.last_error = Some(message.clone());

                if registered.policy.is_exhausted(resource.escalation_tier) {
                    let options = registered.strategy.intervention_options(resource);
                    self.open_intervention(resource, message, options);
                }
                Ok(Some(false))
            }
        }
    }

    fn release(&self, id: &str, attempt_id: u64) {
        self.in_flight
            .remove_if(id, |_, in_flight| in_flight.attempt_id == attempt_id);
    }

    /// Cancel the in-flight attempt of a resource; its result is discarded
    pub fn cancel(&self, id: &str) -> bool {
        match self.in_flight.remove(id) {
            Some((_, in_flight)) => {
                in_flight.token.cancel();
                tracing::debug!(resource_id = %id, "recovery cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn attempt_token(&self) -> Option<CancellationToken> {
        let root = self.root.lock();
        (!root.is_cancelled()).then(|| root.child_token())
    }

    /// Cancel every attempt and refuse new dispatches
    ///
    /// Resources left `recovering` are the caller's to move back to `stuck`.
    pub fn shutdown(&self) {
        self.root.lock().cancel();
        self.in_flight.clear();
    }

    /// Accept dispatches again after [`shutdown`](Self::shutdown)
    ///
    /// Returns false if the engine was not shut down.
    pub fn resume(&self) -> bool {
        let mut root = self.root.lock();
        if !root.is_cancelled() {
            return false;
        }
        *root = CancellationToken::new();
        tracing::debug!("recovery engine resumed");
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.lock().is_cancelled()
    }
}

impl std::fmt::Debug for RecoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryEngine")
            .field("in_flight", &self.in_flight.len())
            .field("available_workers", &self.permits.available_permits())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::lifecycle::HistoryLog;
    use crate::recovery::{ScriptStep, ScriptedStrategy};
    use crate::types::{RecoveryPolicy, ResourceConfig};
    use chrono::Utc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct Harness {
        engine: Arc<RecoveryEngine>,
        registry: Arc<ResourceRegistry>,
        interventions: Arc<InterventionManager>,
        events: broadcast::Receiver<SupervisorEvent>,
    }

    fn harness(strategy: Arc<ScriptedStrategy>, max_concurrent: usize) -> Harness {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let events = EventBus::default();
        let registry = Arc::new(ResourceRegistry::new(
            Arc::new(HistoryLog::new()),
            events.clone(),
            clock.clone(),
        ));
        let strategies = Arc::new(RecoveryStrategyRegistry::new(Duration::from_secs(30)));
        strategies
            .register(
                "tool_execution",
                RecoveryPolicy::new(
                    Duration::from_secs(5),
                    vec![
                        RecoveryTier::new(0, "restart", Duration::from_millis(200)),
                        RecoveryTier::new(1, "restart_clean", Duration::from_millis(200)),
                    ],
                ),
                strategy,
            )
            .unwrap();
        let interventions = Arc::new(InterventionManager::new(events.clone(), clock));
        let engine = Arc::new(RecoveryEngine::new(
            registry.clone(),
            strategies,
            interventions.clone(),
            events.clone(),
            max_concurrent,
        ));
        Harness {
            engine,
            registry,
            interventions,
            events: events.subscribe(),
        }
    }

    fn spawn_stuck(registry: &ResourceRegistry, id: &str, resource_type: &str) {
        registry
            .spawn(resource_type, ResourceConfig::new().with_id(id))
            .unwrap();
        registry.transition(id, ResourceState::Stuck, "stale").unwrap();
    }

    async fn next_finished(events: &mut broadcast::Receiver<SupervisorEvent>) -> (String, bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(SupervisorEvent::RecoveryFinished {
                    resource_id,
                    success,
                    ..
                }) = events.recv().await
                {
                    return (resource_id, success);
                }
            }
        })
        .await
        .expect("recovery did not finish")
    }

    #[tokio::test]
    async fn test_successful_recovery_resets_escalation() {
        let mut h = harness(Arc::new(ScriptedStrategy::new()), 4);
        spawn_stuck(&h.registry, "r1", "tool_execution");

        let outcome = h.engine.dispatch("r1", DispatchMode::Automatic).unwrap();
        assert_eq!(outcome, DispatchOutcome::Dispatched { tier: 0, attempt: 1 });

        assert_eq!(next_finished(&mut h.events).await, ("r1".to_string(), true));
        let resource = h.registry.get("r1").unwrap();
        assert_eq!(resource.state, ResourceState::Running);
        assert_eq!(resource.escalation_tier, 0);
        assert_eq!(resource.recovery_attempts, 1);
        assert!(resource.attempted_tiers.is_empty());
        assert!(!h.engine.is_in_flight("r1"));
    }

    #[tokio::test]
    async fn test_failures_escalate_then_open_one_intervention() {
        let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Fail(
            "exit code 1".to_string(),
        )));
        let mut h = harness(strategy, 4);
        spawn_stuck(&h.registry, "r1", "tool_execution");

        for expected_tier in [0, 1] {
            let outcome = h.engine.dispatch("r1", DispatchMode::Automatic).unwrap();
            assert!(matches!(outcome, DispatchOutcome::Dispatched { tier, .. } if tier == expected_tier));
            assert_eq!(next_finished(&mut h.events).await, ("r1".to_string(), false));
        }

        let resource = h.registry.get("r1").unwrap();
        assert_eq!(resource.state, ResourceState::Stuck);
        assert_eq!(resource.escalation_tier, 2);
        assert_eq!(resource.recovery_attempts, 2);

        let pending = h.interventions.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempted_tiers, vec![0, 1]);
        assert_eq!(pending[0].failure_context.last_state, ResourceState::Recovering);
        assert!(pending[0].failure_context.error.contains("exit code 1"));

        let again = h.engine.dispatch("r1", DispatchMode::Automatic).unwrap();
        assert_eq!(again, DispatchOutcome::AwaitingOperator(pending[0].id.clone()));
        assert_eq!(h.interventions.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_and_panic_count_as_failures() {
        let strategy = Arc::new(ScriptedStrategy::new());
        strategy.push_steps_for("slow", [ScriptStep::Hang]);
        strategy.push_steps_for("broken", [ScriptStep::Panic("strategy bug".to_string())]);
        let mut h = harness(strategy, 4);
        spawn_stuck(&h.registry, "slow", "tool_execution");
        spawn_stuck(&h.registry, "broken", "tool_execution");

        h.engine.dispatch("slow", DispatchMode::Automatic).unwrap();
        h.engine.dispatch("broken", DispatchMode::Automatic).unwrap();
        let mut finished = vec![
            next_finished(&mut h.events).await,
            next_finished(&mut h.events).await,
        ];
        finished.sort();
        assert_eq!(
            finished,
            vec![("broken".to_string(), false), ("slow".to_string(), false)]
        );

        let slow = h.registry.get("slow").unwrap();
        assert!(slow.last_error.unwrap().contains("timed out"));
        let broken = h.registry.get("broken").unwrap();
        assert!(broken.last_error.unwrap().contains("strategy bug"));
    }

    #[tokio::test]
    async fn test_single_attempt_in_flight() {
        let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Hang));
        let h = harness(strategy, 4);
        spawn_stuck(&h.registry, "r1", "tool_execution");

        assert!(matches!(
            h.engine.dispatch("r1", DispatchMode::Automatic).unwrap(),
            DispatchOutcome::Dispatched { .. }
        ));
        assert_eq!(
            h.engine.dispatch("r1", DispatchMode::Automatic).unwrap(),
            DispatchOutcome::AlreadyInFlight
        );
        assert!(matches!(
            h.engine.dispatch("r1", DispatchMode::Manual),
            Err(WardenError::RecoveryInFlight { .. })
        ));
        assert_eq!(h.registry.get("r1").unwrap().recovery_attempts, 1);
    }

    #[tokio::test]
    async fn test_cancelled_result_is_discarded() {
        let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Delay(
            Duration::from_millis(50),
        )));
        let h = harness(strategy, 4);
        spawn_stuck(&h.registry, "r1", "tool_execution");
        h.engine.dispatch("r1", DispatchMode::Automatic).unwrap();

        assert!(h.engine.cancel("r1"));
        h.registry.fail_naturally("r1", "owner gave up").unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        let resource = h.registry.get("r1").unwrap();
        assert_eq!(resource.state, ResourceState::Failed);
        assert_eq!(h.registry.history().history("r1").len(), 4);
        assert!(!h.engine.cancel("r1"));
    }

    #[tokio::test]
    async fn test_unregistered_type_escalates_immediately() {
        let h = harness(Arc::new(ScriptedStrategy::new()), 4);
        spawn_stuck(&h.registry, "x1", "mystery");

        let outcome = h.engine.dispatch("x1", DispatchMode::Automatic).unwrap();
        let DispatchOutcome::AwaitingOperator(request_id) = outcome else {
            panic!("expected an intervention, got {:?}", outcome);
        };
        let request = h.interventions.get(&request_id).unwrap();
        let ids: Vec<&str> = request.options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["stop", "kill"]);
        assert_eq!(h.registry.get("x1").unwrap().state, ResourceState::Stuck);

        assert!(matches!(
            h.engine.dispatch("x1", DispatchMode::Manual),
            Err(WardenError::StrategyNotRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn test_manual_dispatch_requires_stuck() {
        let h = harness(Arc::new(ScriptedStrategy::new()), 4);
        h.registry
            .spawn("tool_execution", ResourceConfig::new().with_id("r1"))
            .unwrap();

        assert!(matches!(
            h.engine.dispatch("r1", DispatchMode::Manual),
            Err(WardenError::InvalidTransition { .. })
        ));
        assert_eq!(
            h.engine.dispatch("r1", DispatchMode::Automatic).unwrap(),
            DispatchOutcome::Skipped
        );
        assert!(!h.engine.is_in_flight("r1"));
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrency() {
        let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Delay(
            Duration::from_millis(30),
        )));
        let mut h = harness(strategy, 1);
        for id in ["a", "b", "c"] {
            spawn_stuck(&h.registry, id, "tool_execution");
            h.engine.dispatch(id, DispatchMode::Automatic).unwrap();
        }
        assert_eq!(h.engine.in_flight_count(), 3);

        for _ in 0..3 {
            let (_, success) = next_finished(&mut h.events).await;
            assert!(success);
        }
        assert_eq!(h.engine.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_dispatch() {
        let h = harness(Arc::new(ScriptedStrategy::new()), 4);
        spawn_stuck(&h.registry, "r1", "tool_execution");
        h.engine.shutdown();
        assert!(h.engine.is_shut_down());
        assert_eq!(
            h.engine.dispatch("r1", DispatchMode::Manual).unwrap(),
            DispatchOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_resume_accepts_dispatch_after_shutdown() {
        let mut h = harness(Arc::new(ScriptedStrategy::new()), 4);
        spawn_stuck(&h.registry, "r1", "tool_execution");
        assert!(!h.engine.resume());

        h.engine.shutdown();
        assert!(h.engine.resume());
        assert!(!h.engine.is_shut_down());

        assert!(matches!(
            h.engine.dispatch("r1", DispatchMode::Automatic).unwrap(),
            DispatchOutcome::Dispatched { tier: 0, .. }
        ));
        let (_, success) = next_finished(&mut h.events).await;
        assert!(success);
        assert_eq!(h.registry.get("r1").unwrap().state, ResourceState::Running);
    }
}

//! Tests for the supervisor facade

use super::*;
use crate::clock::ManualClock;
use crate::persistence::MemorySnapshotStore;
use crate::error::StrategyError;
use crate::recovery::{DispatchOutcome, MockRecoveryStrategy, ScriptStep, ScriptedStrategy};
use crate::types::{
    Directive, InterventionOption, InterventionResolution, RecoveryTier, UserInterventionRequest,
};
use chrono::Utc;
use std::time::Duration;

fn two_tier_policy() -> RecoveryPolicy {
    RecoveryPolicy::new(
        Duration::from_secs(5),
        vec![
            RecoveryTier::new(0, "restart", Duration::from_secs(1)),
            RecoveryTier::new(1, "restart_clean", Duration::from_secs(1)),
        ],
    )
}

fn config() -> SupervisorConfig {
    SupervisorConfig::default()
        .with_tick_interval(Duration::from_millis(20))
        .with_policy("tool_execution", two_tier_policy())
}

fn new_supervisor(strategy: Arc<ScriptedStrategy>) -> (Supervisor, Arc<ManualClock>) {
    new_supervisor_with(config(), strategy)
}

fn new_supervisor_with(
    config: SupervisorConfig,
    strategy: Arc<ScriptedStrategy>,
) -> (Supervisor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let supervisor = Supervisor::builder(config)
        .with_clock(clock.clone())
        .with_strategy("tool_execution", strategy)
        .build()
        .unwrap();
    (supervisor, clock)
}

/// Poll until `check` holds for the resource and no attempt is in flight
async fn wait_for(supervisor: &Supervisor, id: &str, check: impl Fn(&Resource) -> bool) -> Resource {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let resource = supervisor.get_resource_status(id).unwrap();
            if check(&resource) && !supervisor.is_recovery_in_flight(id) {
                return resource;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("resource never reached the expected state")
}

/// Spawn `id`, let its heartbeat lapse and fail every automatic tier
async fn exhaust(supervisor: &Supervisor, clock: &ManualClock, id: &str) -> UserInterventionRequest {
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id(id))
        .unwrap();
    clock.advance(Duration::from_secs(6));
    for step in 1..=2u32 {
        supervisor.tick();
        wait_for(supervisor, id, |r| {
            r.state == ResourceState::Stuck && r.escalation_tier == step
        })
        .await;
    }
    supervisor
        .get_pending_interventions()
        .into_iter()
        .find(|r| r.resource_id == id)
        .expect("intervention not opened")
}

#[tokio::test]
async fn test_scenario_retry_resumes_at_last_tier() {
    let strategy = Arc::new(ScriptedStrategy::new());
    strategy.push_steps_for(
        "r1",
        [
            ScriptStep::Fail("tier 0 failed".to_string()),
            ScriptStep::Fail("tier 1 failed".to_string()),
            ScriptStep::Succeed,
        ],
    );
    let (supervisor, clock) = new_supervisor(strategy.clone());
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r1"))
        .unwrap();

    // Exactly at the timeout the resource is not yet stale
    clock.advance(Duration::from_secs(5));
    assert_eq!(supervisor.tick().marked_stuck, 0);
    assert_eq!(supervisor.get_resource_status("r1").unwrap().state, ResourceState::Running);

    clock.advance(Duration::from_secs(1));
    let report = supervisor.tick();
    assert_eq!(report.marked_stuck, 1);
    assert_eq!(report.dispatched, 1);
    wait_for(&supervisor, "r1", |r| r.escalation_tier == 1).await;

    assert_eq!(supervisor.tick().dispatched, 1);
    let resource = wait_for(&supervisor, "r1", |r| r.escalation_tier == 2).await;
    assert_eq!(resource.state, ResourceState::Stuck);
    assert_eq!(resource.recovery_attempts, 2);

    let pending = supervisor.get_pending_interventions();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempted_tiers, vec![0, 1]);
    assert_eq!(pending[0].failure_context.error, "tier 1 (restart_clean) failed: tier 1 failed");

    // Further ticks neither dispatch nor open another request
    let report = supervisor.tick();
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.interventions_opened, 0);
    assert_eq!(supervisor.get_pending_interventions().len(), 1);
    assert_eq!(supervisor.get_stats().pending_interventions, 1);

    let resolved = supervisor
        .resolve_intervention(&pending[0].id, "retry", None)
        .await
        .unwrap();
    assert!(resolved.resolved_at.is_some());

    let resource = wait_for(&supervisor, "r1", |r| r.state == ResourceState::Running).await;
    assert_eq!(resource.escalation_tier, 0);
    assert_eq!(resource.recovery_attempts, 3);
    assert_eq!(
        strategy.calls_for("r1"),
        vec!["restart", "restart_clean", "restart_clean"]
    );
    assert!(supervisor.get_pending_interventions().is_empty());
}

#[tokio::test]
async fn test_destructive_resolution_recorded_once() {
    let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Fail(
        "crashed".to_string(),
    )));
    let (supervisor, clock) = new_supervisor(strategy.clone());
    let request = exhaust(&supervisor, &clock, "r1").await;

    let resolved = supervisor
        .resolve_intervention(&request.id, "kill", None)
        .await
        .unwrap();
    assert_eq!(
        resolved.resolution.as_ref().map(|r| r.option_id.as_str()),
        Some("kill")
    );
    assert_eq!(supervisor.get_resource_status("r1").unwrap().state, ResourceState::Failed);
    assert!(strategy.calls_for("r1").contains(&"kill".to_string()));

    let err = supervisor
        .resolve_intervention(&request.id, "stop", None)
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::InterventionAlreadyResolved { .. }));
    let stored = supervisor.get_intervention(&request.id).unwrap();
    assert_eq!(stored.resolution, resolved.resolution);
    assert_eq!(stored.resolved_at, resolved.resolved_at);
}

#[tokio::test]
async fn test_resolve_rejects_unknown_request_and_option() {
    let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Fail(
        "crashed".to_string(),
    )));
    let (supervisor, clock) = new_supervisor(strategy);
    let request = exhaust(&supervisor, &clock, "r1").await;

    assert!(matches!(
        supervisor.resolve_intervention("missing", "retry", None).await,
        Err(WardenError::NotFound { .. })
    ));
    assert!(matches!(
        supervisor.resolve_intervention(&request.id, "reformat", None).await,
        Err(WardenError::InvalidOption { .. })
    ));
    assert!(supervisor.get_intervention(&request.id).unwrap().is_open());
    assert_eq!(supervisor.get_resource_status("r1").unwrap().state, ResourceState::Stuck);
}

#[tokio::test]
async fn test_custom_option_maps_to_directive() {
    let strategy = Arc::new(
        ScriptedStrategy::with_fallback(ScriptStep::Fail("crashed".to_string())).with_option(
            InterventionOption::new("discard", "Discard", "Drop partial output and stop", true),
            Directive::Stop,
        ),
    );
    let (supervisor, clock) = new_supervisor(strategy.clone());
    let request = exhaust(&supervisor, &clock, "r1").await;
    assert!(request.option("discard").is_some());

    supervisor
        .resolve_intervention(&request.id, "discard", Some(serde_json::json!({"keep_logs": true})))
        .await
        .unwrap();

    let resource = supervisor.get_resource_status("r1").unwrap();
    assert_eq!(resource.state, ResourceState::Failed);
    assert!(strategy.calls_for("r1").contains(&"stop".to_string()));
    let stored = supervisor.get_intervention(&request.id).unwrap();
    assert_eq!(
        stored.resolution.and_then(|r| r.extra),
        Some(serde_json::json!({"keep_logs": true}))
    );
}

#[tokio::test]
async fn test_owner_completion_supersedes_intervention() {
    let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Fail(
        "crashed".to_string(),
    )));
    let (supervisor, clock) = new_supervisor(strategy);
    let request = exhaust(&supervisor, &clock, "r1").await;

    supervisor.complete("r1").unwrap();
    assert!(supervisor.get_pending_interventions().is_empty());
    let stored = supervisor.get_intervention(&request.id).unwrap();
    assert_eq!(
        stored.resolution.map(|r| r.option_id),
        Some(InterventionResolution::SUPERSEDED.to_string())
    );
    assert!(matches!(
        supervisor.resolve_intervention(&request.id, "retry", None).await,
        Err(WardenError::InterventionAlreadyResolved { .. })
    ));
}

#[tokio::test]
async fn test_operator_retry_closes_open_request() {
    let strategy = Arc::new(ScriptedStrategy::new());
    strategy.push_steps_for(
        "r1",
        [
            ScriptStep::Fail("one".to_string()),
            ScriptStep::Fail("two".to_string()),
        ],
    );
    let (supervisor, clock) = new_supervisor(strategy);
    let request = exhaust(&supervisor, &clock, "r1").await;

    let outcome = supervisor.retry_resource("r1").unwrap();
    assert_eq!(outcome, DispatchOutcome::Dispatched { tier: 1, attempt: 3 });
    wait_for(&supervisor, "r1", |r| r.state == ResourceState::Running).await;

    let stored = supervisor.get_intervention(&request.id).unwrap();
    assert_eq!(stored.resolution.map(|r| r.option_id), Some("retry".to_string()));
    assert!(matches!(
        supervisor.retry_resource("r1"),
        Err(WardenError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_stop_cancels_in_flight_recovery() {
    let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Hang));
    let (supervisor, clock) = new_supervisor(strategy.clone());
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r1"))
        .unwrap();
    clock.advance(Duration::from_secs(6));
    assert_eq!(supervisor.tick().dispatched, 1);
    assert!(supervisor.is_recovery_in_flight("r1"));
    tokio::time::timeout(Duration::from_secs(5), async {
        while strategy.calls_for("r1").is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("recovery action never started");

    let transition = supervisor.stop_resource("r1").await.unwrap();
    assert_eq!(transition.from, ResourceState::Recovering);
    assert_eq!(transition.to, ResourceState::Failed);
    assert!(!supervisor.is_recovery_in_flight("r1"));

    // The cancelled attempt must not write its result back
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(supervisor.get_resource_status("r1").unwrap().state, ResourceState::Failed);
    assert_eq!(strategy.calls_for("r1"), vec!["restart", "stop"]);

    assert!(matches!(
        supervisor.kill_resource("r1").await,
        Err(WardenError::InvalidTransition { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_racing_a_tick_leaves_no_attempt_running() {
    let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Hang));
    let (supervisor, clock) = new_supervisor(strategy.clone());
    let supervisor = Arc::new(supervisor);
    let ids: Vec<String> = (0..32).map(|i| format!("r{}", i)).collect();
    for id in &ids {
        supervisor
            .spawn_resource("tool_execution", ResourceConfig::new().with_id(id.as_str()))
            .unwrap();
    }
    clock.advance(Duration::from_secs(6));

    let ticker = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.tick() })
    };
    let mut stops = Vec::new();
    for id in ids.clone() {
        let supervisor = supervisor.clone();
        stops.push(tokio::spawn(async move { supervisor.stop_resource(&id).await }));
    }
    ticker.await.unwrap();
    for stop in stops {
        stop.await.unwrap().unwrap();
    }

    // Whatever the interleaving, every attempt died with its resource
    for id in &ids {
        assert_eq!(supervisor.get_resource_status(id).unwrap().state, ResourceState::Failed);
        assert!(!supervisor.is_recovery_in_flight(id), "{} still recovering", id);
    }
    assert!(supervisor.get_pending_interventions().is_empty());
    assert_eq!(supervisor.tick().dispatched, 0);
}

#[tokio::test]
async fn test_shutdown_requeues_recovering_and_start_resumes() {
    let strategy = Arc::new(ScriptedStrategy::new());
    strategy.push_steps_for("r1", [ScriptStep::Hang]);
    let (supervisor, clock) = new_supervisor(strategy.clone());
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r1"))
        .unwrap();
    clock.advance(Duration::from_secs(6));
    assert_eq!(supervisor.tick().dispatched, 1);
    assert_eq!(
        supervisor.get_resource_status("r1").unwrap().state,
        ResourceState::Recovering
    );

    supervisor.shutdown().await;
    assert_eq!(supervisor.get_resource_status("r1").unwrap().state, ResourceState::Stuck);
    assert!(!supervisor.is_recovery_in_flight("r1"));
    assert_eq!(
        supervisor
            .get_resource_history("r1")
            .unwrap()
            .last()
            .map(|t| (t.from, t.to)),
        Some((ResourceState::Recovering, ResourceState::Stuck))
    );
    // Shut down: passes dispatch nothing
    assert_eq!(supervisor.tick().dispatched, 0);

    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r2"))
        .unwrap();
    assert!(supervisor.start());
    assert!(supervisor.is_monitoring());
    clock.advance(Duration::from_secs(6));

    let r1 = wait_for(&supervisor, "r1", |r| r.state == ResourceState::Running).await;
    let r2 = wait_for(&supervisor, "r2", |r| r.state == ResourceState::Running).await;
    assert_eq!(r1.escalation_tier, 0);
    assert_eq!(r1.recovery_attempts, 2);
    assert_eq!(r2.recovery_attempts, 1);
    assert!(supervisor.get_pending_interventions().is_empty());
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_kill_running_resource() {
    let strategy = Arc::new(ScriptedStrategy::new());
    let (supervisor, _clock) = new_supervisor(strategy.clone());
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r1"))
        .unwrap();

    supervisor.kill_resource("r1").await.unwrap();
    assert_eq!(supervisor.get_resource_status("r1").unwrap().state, ResourceState::Failed);
    assert_eq!(strategy.calls_for("r1"), vec!["kill"]);
}

#[tokio::test]
async fn test_strategy_stop_failure_is_best_effort() {
    let mut strategy = MockRecoveryStrategy::new();
    strategy
        .expect_stop()
        .times(1)
        .returning(|_| Err(StrategyError::failed("process already gone")));
    strategy.expect_kill().never();
    strategy.expect_recover().never();

    let supervisor = Supervisor::builder(config())
        .with_strategy("tool_execution", Arc::new(strategy))
        .build()
        .unwrap();
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r1"))
        .unwrap();

    let transition = supervisor.stop_resource("r1").await.unwrap();
    assert_eq!(transition.to, ResourceState::Failed);
    assert_eq!(supervisor.get_resource_status("r1").unwrap().state, ResourceState::Failed);
}

#[tokio::test]
async fn test_unregistered_type_goes_straight_to_operator() {
    let (supervisor, clock) = new_supervisor(Arc::new(ScriptedStrategy::new()));
    supervisor
        .spawn_resource("browser_tab", ResourceConfig::new().with_id("tab1"))
        .unwrap();
    clock.advance(Duration::from_secs(31));

    let report = supervisor.tick();
    assert_eq!(report.marked_stuck, 1);
    assert_eq!(report.interventions_opened, 1);
    assert_eq!(report.dispatched, 0);

    let pending = supervisor.get_pending_interventions();
    assert!(pending[0].option("retry").is_none());
    assert!(matches!(
        supervisor.retry_resource("tab1"),
        Err(WardenError::StrategyNotRegistered { .. })
    ));

    supervisor
        .resolve_intervention(&pending[0].id, "stop", None)
        .await
        .unwrap();
    assert_eq!(supervisor.get_resource_status("tab1").unwrap().state, ResourceState::Failed);
}

#[tokio::test]
async fn test_heartbeats_keep_resource_running() {
    let (supervisor, clock) = new_supervisor(Arc::new(ScriptedStrategy::new()));
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r1"))
        .unwrap();

    for _ in 0..3 {
        clock.advance(Duration::from_secs(4));
        supervisor.record_heartbeat("r1").unwrap();
        supervisor
            .update_progress("r1", Some(0.3), Some("fetching".to_string()))
            .unwrap();
        assert_eq!(supervisor.tick().marked_stuck, 0);
    }
    let resource = supervisor.get_resource_status("r1").unwrap();
    assert_eq!(resource.state, ResourceState::Running);
    assert_eq!(supervisor.get_resource_history("r1").unwrap().len(), 1);
}

#[tokio::test]
async fn test_history_is_ordered_without_gaps() {
    let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Fail(
        "crashed".to_string(),
    )));
    let (supervisor, clock) = new_supervisor(strategy);
    let request = exhaust(&supervisor, &clock, "r1").await;
    supervisor
        .resolve_intervention(&request.id, "stop", None)
        .await
        .unwrap();

    let history = supervisor.get_resource_history("r1").unwrap();
    let edges: Vec<(ResourceState, ResourceState)> = history.iter().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        edges,
        vec![
            (ResourceState::Idle, ResourceState::Running),
            (ResourceState::Running, ResourceState::Stuck),
            (ResourceState::Stuck, ResourceState::Recovering),
            (ResourceState::Recovering, ResourceState::Stuck),
            (ResourceState::Stuck, ResourceState::Recovering),
            (ResourceState::Recovering, ResourceState::Stuck),
            (ResourceState::Stuck, ResourceState::Failed),
        ]
    );
    for pair in history.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
        assert_eq!(pair[0].to, pair[1].from);
    }
}

#[tokio::test]
async fn test_terminal_resources_are_pruned() {
    let config = config().with_terminal_retention(Duration::from_secs(60));
    let (supervisor, clock) = new_supervisor_with(config, Arc::new(ScriptedStrategy::new()));
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("done"))
        .unwrap();
    supervisor.complete("done").unwrap();
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("live"))
        .unwrap();
    assert!(matches!(
        supervisor.remove_resource("live"),
        Err(WardenError::NotTerminal { .. })
    ));

    clock.advance(Duration::from_secs(30));
    supervisor.record_heartbeat("live").unwrap();
    assert_eq!(supervisor.tick().pruned, 0);

    clock.advance(Duration::from_secs(31));
    supervisor.record_heartbeat("live").unwrap();
    assert_eq!(supervisor.tick().pruned, 1);

    assert!(matches!(
        supervisor.get_resource_status("done"),
        Err(WardenError::NotFound { .. })
    ));
    assert_eq!(supervisor.get_resource_history("done").unwrap().len(), 2);
    assert_eq!(supervisor.list_all().len(), 1);

    // A pruned id stays retired so its history never gains a second life
    assert!(matches!(
        supervisor.spawn_resource("tool_execution", ResourceConfig::new().with_id("done")),
        Err(WardenError::InvalidInput { .. })
    ));
    assert_eq!(supervisor.get_resource_history("done").unwrap().len(), 2);
}

#[tokio::test]
async fn test_snapshot_restore_requeues_recovering() {
    let strategy = Arc::new(ScriptedStrategy::with_fallback(ScriptStep::Hang));
    let (supervisor, clock) = new_supervisor(strategy);
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("healthy"))
        .unwrap();
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("busy"))
        .unwrap();
    clock.advance(Duration::from_secs(6));
    supervisor.record_heartbeat("healthy").unwrap();
    supervisor.tick();
    assert_eq!(
        supervisor.get_resource_status("busy").unwrap().state,
        ResourceState::Recovering
    );

    let store = MemorySnapshotStore::new();
    assert_eq!(supervisor.persist_snapshot(&store).await.unwrap(), 2);
    supervisor.shutdown().await;

    let (restored, _clock) = new_supervisor(Arc::new(ScriptedStrategy::new()));
    assert_eq!(restored.restore(&store).await.unwrap(), 2);
    let busy = restored.get_resource_status("busy").unwrap();
    assert_eq!(busy.state, ResourceState::Stuck);
    assert_eq!(busy.attempted_tiers, vec![0]);
    assert_eq!(
        restored.get_resource_status("healthy").unwrap().state,
        ResourceState::Running
    );

    // Restoring twice skips records already tracked
    assert_eq!(restored.restore(&store).await.unwrap(), 0);
}

#[tokio::test]
async fn test_monitor_start_and_shutdown() {
    let (supervisor, _clock) = new_supervisor(Arc::new(ScriptedStrategy::new()));
    let mut events = supervisor.subscribe();
    assert!(!supervisor.is_monitoring());

    assert!(supervisor.start());
    assert!(!supervisor.start());
    assert!(supervisor.is_monitoring());
    assert!(matches!(events.recv().await, Ok(SupervisorEvent::MonitorStarted)));

    supervisor.shutdown().await;
    assert!(!supervisor.is_monitoring());
    assert!(matches!(events.recv().await, Ok(SupervisorEvent::MonitorStopped)));
}

#[tokio::test]
async fn test_monitor_loop_detects_staleness() {
    let (supervisor, clock) = new_supervisor(Arc::new(ScriptedStrategy::with_fallback(
        ScriptStep::Hang,
    )));
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("r1"))
        .unwrap();
    supervisor.start();
    clock.advance(Duration::from_secs(6));

    tokio::time::timeout(Duration::from_secs(5), async {
        while supervisor.get_resource_status("r1").unwrap().state != ResourceState::Recovering {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("monitor loop never dispatched recovery");
    supervisor.shutdown().await;
}

#[test]
fn test_builder_requires_policy_for_strategy() {
    let err = Supervisor::builder(SupervisorConfig::default())
        .with_strategy("container", Arc::new(ScriptedStrategy::new()))
        .build()
        .unwrap_err();
    assert_eq!(err.error_code(), "WARDEN_CONFIG");

    let supervisor = Supervisor::builder(SupervisorConfig::default())
        .with_policy_and_strategy("container", two_tier_policy(), Arc::new(ScriptedStrategy::new()))
        .build();
    assert!(supervisor.is_ok());
}

#[test]
fn test_unknown_ids_are_not_found() {
    let supervisor = Supervisor::new(SupervisorConfig::default()).unwrap();
    for result in [
        supervisor.record_heartbeat("ghost"),
        supervisor.update_progress("ghost", Some(0.1), None),
    ] {
        assert!(matches!(result, Err(WardenError::NotFound { .. })));
    }
    assert!(supervisor.get_resource_status("ghost").is_err());
    assert!(supervisor.get_resource_history("ghost").is_err());
    assert!(supervisor.complete("ghost").is_err());
}

#[test]
fn test_stats_partition_resources() {
    let (supervisor, _clock) = new_supervisor(Arc::new(ScriptedStrategy::new()));
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("a"))
        .unwrap();
    supervisor
        .spawn_resource("tool_execution", ResourceConfig::new().with_id("b"))
        .unwrap();
    supervisor
        .spawn_resource("agent_session", ResourceConfig::new().with_id("c").deferred())
        .unwrap();
    supervisor.fail_naturally("b", "exit status 2").unwrap();

    let stats = supervisor.get_stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.idle, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.healthy, 2);
    assert_eq!(stats.degraded, 1);
    assert_eq!(supervisor.list_by_type("tool_execution").len(), 2);
    assert_eq!(
        supervisor.get_resource_status("b").unwrap().last_error.as_deref(),
        Some("exit status 2")
    );
}

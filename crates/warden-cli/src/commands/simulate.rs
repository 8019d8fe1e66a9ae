//! Scripted supervisor simulation
//!
//! Spawns resources against a [`ScriptedStrategy`], lets their heartbeats
//! lapse on a manual clock and drives monitor passes until recovery settles.

use crate::args::SimulateArgs;
use crate::console::{CliConsole, state_label};
use anyhow::Context;
use chrono::Utc;
use colored::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use warden_core::{
    ManualClock, RecoveryPolicy, RecoveryTier, Resource, ResourceConfig, ScriptStep,
    ScriptedStrategy, Supervisor, SupervisorConfig, SupervisorStats, TickReport,
    UserInterventionRequest,
};
use warden_store::{JsonSnapshotStore, JsonlHistorySink};

const SETTLE_POLL: Duration = Duration::from_millis(10);

/// Final state of a simulation run
#[derive(Debug, Serialize)]
pub struct SimulationOutcome {
    pub ticks: Vec<TickReport>,
    pub resolved: Vec<UserInterventionRequest>,
    pub pending: Vec<UserInterventionRequest>,
    pub resources: Vec<Resource>,
    pub stats: SupervisorStats,
    pub snapshots_written: Option<usize>,
}

pub async fn run(config: SupervisorConfig, args: SimulateArgs) -> anyhow::Result<()> {
    let json = args.json;
    let outcome = execute(config, &args).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn default_policy() -> RecoveryPolicy {
    RecoveryPolicy::new(
        Duration::from_secs(30),
        vec![
            RecoveryTier::new(0, "restart", Duration::from_secs(1)),
            RecoveryTier::new(1, "restart_clean", Duration::from_secs(1)),
        ],
    )
}

pub async fn execute(config: SupervisorConfig, args: &SimulateArgs) -> anyhow::Result<SimulationOutcome> {
    let policy = config
        .policy(&args.resource_type)
        .cloned()
        .unwrap_or_else(default_policy);
    let settle_limit = policy
        .tiers
        .iter()
        .map(|tier| tier.timeout)
        .max()
        .unwrap_or_default()
        + Duration::from_secs(1);

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let strategy = Arc::new(ScriptedStrategy::new());
    let mut builder = Supervisor::builder(config.clone())
        .with_clock(clock.clone())
        .with_policy_and_strategy(&args.resource_type, policy.clone(), strategy.clone());
    if args.persist {
        let sink = JsonlHistorySink::with_path(config.storage.history_dir());
        builder = builder.with_history_sink(Arc::new(sink));
    }
    let supervisor = builder.build().context("failed to build supervisor")?;

    let failing = if args.hang {
        ScriptStep::Hang
    } else {
        ScriptStep::Fail("scripted failure".to_string())
    };
    for index in 0..args.resources {
        let id = format!("sim-{}", index + 1);
        strategy.push_steps_for(&id, std::iter::repeat_n(failing.clone(), args.failures));
        supervisor.spawn_resource(
            &args.resource_type,
            ResourceConfig::new()
                .with_id(id)
                .with_metadata(serde_json::json!({ "simulated": true })),
        )?;
    }

    // every resource goes silent at once
    clock.advance(policy.heartbeat_timeout + Duration::from_secs(1));

    let mut ticks = Vec::new();
    for _ in 0..args.max_ticks {
        let report = supervisor.tick();
        let dispatched = report.dispatched;
        ticks.push(report);
        settle(&supervisor, settle_limit).await;
        if dispatched == 0 {
            break;
        }
    }

    let mut resolved = Vec::new();
    if let Some(option_id) = &args.resolve {
        for request in supervisor.get_pending_interventions() {
            match supervisor
                .resolve_intervention(&request.id, option_id, None)
                .await
            {
                Ok(request) => resolved.push(request),
                Err(e) => tracing::warn!(
                    request_id = %request.id,
                    option_id = %option_id,
                    error = %e,
                    "intervention not resolved"
                ),
            }
        }
        settle(&supervisor, settle_limit).await;
    }

    let snapshots_written = if args.persist {
        let store = JsonSnapshotStore::with_path(config.storage.snapshot_dir());
        Some(supervisor.persist_snapshot(&store).await?)
    } else {
        None
    };

    let outcome = SimulationOutcome {
        ticks,
        resolved,
        pending: supervisor.get_pending_interventions(),
        resources: supervisor.list_all(),
        stats: supervisor.get_stats(),
        snapshots_written,
    };
    supervisor.shutdown().await;
    Ok(outcome)
}

/// Wait until no recovery attempt is in flight, up to `limit`
async fn settle(supervisor: &Supervisor, limit: Duration) {
    let deadline = Instant::now() + limit;
    loop {
        let busy = supervisor
            .list_all()
            .iter()
            .filter(|r| supervisor.is_recovery_in_flight(&r.id))
            .count();
        if busy == 0 {
            return;
        }
        if Instant::now() >= deadline {
            tracing::warn!(in_flight = busy, "recovery attempts still running");
            return;
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }
}

fn print_outcome(outcome: &SimulationOutcome) {
    let console = CliConsole::new(true);
    console.print_header("Simulation");

    for (pass, report) in outcome.ticks.iter().enumerate() {
        console.info(&format!(
            "pass {}: scanned {}, stuck {}, dispatched {}",
            pass + 1,
            report.scanned,
            report.marked_stuck,
            report.dispatched
        ));
    }

    for request in &outcome.resolved {
        let option = request
            .resolution
            .as_ref()
            .map(|r| r.option_id.as_str())
            .unwrap_or_default();
        console.success(&format!("resolved {} with '{}'", request.resource_id, option));
    }

    console.print_separator();
    for resource in &outcome.resources {
        println!(
            "{:<10} {:<11} attempts {} tiers {:?}",
            resource.id,
            state_label(resource.state),
            resource.recovery_attempts,
            resource.attempted_tiers
        );
    }

    if !outcome.pending.is_empty() {
        println!();
        println!("{}", "Awaiting operator".yellow().bold());
        for request in &outcome.pending {
            let options: Vec<_> = request.options.iter().map(|o| o.id.as_str()).collect();
            println!(
                "  {} {} ({}) options: {}",
                request.id.dimmed(),
                request.resource_id,
                request.failure_context.error,
                options.join(", ")
            );
        }
    }

    console.print_separator();
    let stats = &outcome.stats;
    console.info(&format!(
        "{} total, {} healthy, {} degraded, {} pending intervention(s)",
        stats.total, stats.healthy, stats.degraded, stats.pending_interventions
    ));
    if let Some(written) = outcome.snapshots_written {
        console.info(&format!("{} snapshot(s) written", written));
    }
}

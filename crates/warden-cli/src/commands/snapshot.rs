//! Persisted snapshot inspection

use crate::console::{CliConsole, state_label};
use colored::*;
use warden_core::{SnapshotStore, StatsAggregator, SupervisorConfig};
use warden_store::JsonSnapshotStore;

/// Print every persisted resource record with aggregate counts
pub async fn run(config: &SupervisorConfig, json: bool) -> anyhow::Result<()> {
    let store = JsonSnapshotStore::with_path(config.storage.snapshot_dir());
    let resources = store.load_all().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resources)?);
        return Ok(());
    }

    let console = CliConsole::new(true);
    if resources.is_empty() {
        console.warn(&format!("No snapshots under {}", store.base_path().display()));
        return Ok(());
    }

    console.print_header("Resource snapshots");
    for resource in &resources {
        let mut line = format!(
            "{:<24} {:<16} {:<11}",
            resource.id,
            resource.resource_type.dimmed(),
            state_label(resource.state)
        );
        if resource.escalation_tier > 0 {
            line.push_str(&format!(" escalation {}", resource.escalation_tier));
        }
        if let Some(error) = &resource.last_error {
            line.push_str(&format!(" {}", error.red()));
        }
        println!("{}", line);
    }

    let stats = StatsAggregator::collect(&resources, 0);
    console.print_separator();
    console.info(&format!(
        "{} total, {} healthy, {} degraded",
        stats.total, stats.healthy, stats.degraded
    ));
    Ok(())
}

//! Persisted history inspection

use crate::console::{CliConsole, state_label};
use colored::*;
use warden_core::{HistorySink, PersistenceError, SupervisorConfig};
use warden_store::JsonlHistorySink;

/// Print the transitions of one resource, or list resources with history
pub async fn run(config: &SupervisorConfig, resource_id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let sink = JsonlHistorySink::with_path(config.storage.history_dir());
    let console = CliConsole::new(!json);

    let Some(resource_id) = resource_id else {
        let ids = sink.resource_ids().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&ids)?);
        } else if ids.is_empty() {
            console.warn(&format!("No history under {}", sink.base_path().display()));
        } else {
            console.print_header("Resources with history");
            for id in ids {
                println!("  {}", id);
            }
        }
        return Ok(());
    };

    let transitions = match sink.read(resource_id).await {
        Ok(transitions) => transitions,
        Err(PersistenceError::NotFound(_)) => {
            anyhow::bail!("no history recorded for resource '{}'", resource_id)
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&transitions)?);
        return Ok(());
    }

    console.print_header(&format!("History of {}", resource_id));
    for transition in &transitions {
        println!(
            "{} {} {} {}  {}",
            transition
                .timestamp
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string()
                .dimmed(),
            state_label(transition.from),
            "→".dimmed(),
            state_label(transition.to),
            transition.reason
        );
    }
    console.print_separator();
    console.info(&format!("{} transition(s)", transitions.len()));
    Ok(())
}

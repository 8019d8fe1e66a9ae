//! Configuration validation command

use crate::console::CliConsole;
use colored::*;
use std::path::Path;
use warden_core::SupervisorConfig;

/// Validate configuration and print the effective recovery ladders
pub fn run(path: Option<&Path>) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Validation");

    match path {
        Some(path) if !path.exists() => {
            console.warn(&format!("Configuration file not found: {}", path.display()));
            console.info("Using default configuration");
        }
        Some(path) => console.info(&format!("Validating configuration file: {}", path.display())),
        None => console.info("No configuration file given; checking defaults and WARDEN_* overrides"),
    }

    let config = match super::load(path) {
        Ok(config) => config,
        Err(e) => {
            console.error(&format!("{:#}", e));
            return Err(e);
        }
    };

    console.success("Configuration is valid");
    console.print_separator();
    print_config(&console, &config);
    Ok(())
}

fn print_config(console: &CliConsole, config: &SupervisorConfig) {
    console.info(&format!("Tick interval: {:?}", config.tick_interval));
    console.info(&format!(
        "Default heartbeat timeout: {:?}",
        config.default_heartbeat_timeout
    ));
    console.info(&format!(
        "Max concurrent recoveries: {}",
        config.max_concurrent_recoveries
    ));
    match config.terminal_retention {
        Some(retention) => console.info(&format!("Terminal retention: {:?}", retention)),
        None => console.info("Terminal retention: keep forever"),
    }
    console.info(&format!(
        "Storage: {}",
        config.storage.resolved_dir().display()
    ));

    if config.types.is_empty() {
        console.warn("No resource types configured; every stuck resource goes straight to an operator");
        return;
    }

    let mut types: Vec<_> = config.types.iter().collect();
    types.sort_by(|a, b| a.0.cmp(b.0));
    for (resource_type, policy) in types {
        println!();
        println!(
            "{} heartbeat {:?}, {} automatic attempt(s)",
            resource_type.cyan().bold(),
            policy.heartbeat_timeout,
            policy.budget()
        );
        for tier in &policy.tiers {
            println!(
                "  {} {:<18} x{} timeout {:?}",
                format!("tier {}", tier.ordinal).dimmed(),
                tier.action.as_str(),
                tier.max_attempts,
                tier.timeout
            );
        }
    }
}

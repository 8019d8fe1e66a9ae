//! Warden CLI application
//!
//! Operator tooling for the Warden resource supervisor.
//!
//! # Commands
//!
//! - `warden check-config [PATH]`: load, override and validate a configuration
//! - `warden simulate`: run the supervisor against scripted failures
//! - `warden history [RESOURCE_ID]`: read persisted transition history
//! - `warden snapshot`: list persisted resource snapshots
//!
//! Logging follows the `logging` section of the configuration; `RUST_LOG`
//! takes precedence when set.

mod args;
mod commands;
mod console;
mod logging;

use args::{Cli, Commands};
use clap::Parser;
use warden_core::LoggingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // check-config reports load errors itself
    if let Commands::CheckConfig { path } = &cli.command {
        logging::init(
            &LoggingConfig::default(),
            cli.log_level.as_deref(),
            cli.log_format.as_deref(),
        )?;
        return commands::check_config::run(path.as_deref().or(cli.config.as_deref()));
    }

    let config = commands::load(cli.config.as_deref())?;
    logging::init(
        &config.logging,
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
    )?;

    match cli.command {
        Commands::CheckConfig { .. } => Ok(()),
        Commands::Simulate(args) => commands::simulate::run(config, args).await,
        Commands::History { resource_id, json } => {
            commands::history::run(&config, resource_id.as_deref(), json).await
        }
        Commands::Snapshot { json } => commands::snapshot::run(&config, json).await,
    }
}

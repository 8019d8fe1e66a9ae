//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Warden - supervisor for long-running resources")]
#[command(
    long_about = r#"Warden - supervisor for long-running resources

USAGE:
  warden check-config warden.toml   # Validate a configuration file
  warden simulate --resources 5     # Exercise recovery with scripted failures
  warden history <resource_id>      # Show persisted transitions
  warden snapshot                   # Show persisted resource records"#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (TOML, YAML or JSON)
    #[arg(long, short, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level filter (overrides the configuration file)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a configuration file and print the recovery ladders
    CheckConfig {
        /// Configuration file; defaults to --config
        path: Option<PathBuf>,
    },

    /// Run the supervisor against scripted strategies
    Simulate(SimulateArgs),

    /// Show persisted transition history
    History {
        /// Resource id; lists resources with history when omitted
        resource_id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show persisted resource snapshots
    Snapshot {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of resources to spawn
    #[arg(long, default_value_t = 3)]
    pub resources: usize,

    /// Resource type; its policy comes from the configuration when present
    #[arg(long = "type", default_value = "tool_execution")]
    pub resource_type: String,

    /// Failing recovery attempts per resource before attempts succeed
    #[arg(long, default_value_t = 2)]
    pub failures: usize,

    /// Failing attempts hang until the tier timeout instead of erroring
    #[arg(long)]
    pub hang: bool,

    /// Resolve every open intervention with this option id
    #[arg(long)]
    pub resolve: Option<String>,

    /// Upper bound on monitor passes
    #[arg(long, default_value_t = 10)]
    pub max_ticks: usize,

    /// Write history and snapshots to the storage directory
    #[arg(long)]
    pub persist: bool,

    /// Output the final state as JSON
    #[arg(long)]
    pub json: bool,
}

//! CLI commands

pub mod check_config;
pub mod history;
pub mod simulate;
pub mod snapshot;

use anyhow::Context;
use std::path::Path;
use warden_core::SupervisorConfig;

/// Load file, env overrides and validation in one step
pub fn load(path: Option<&Path>) -> anyhow::Result<SupervisorConfig> {
    let config = warden_core::load_config(path).with_context(|| match path {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load default configuration".to_string(),
    })?;
    Ok(config)
}

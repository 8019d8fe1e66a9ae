//! Environment variable overrides

use super::model::SupervisorConfig;
use crate::error::{WardenError, WardenResult};
use std::time::Duration;

/// Prefix shared by all supported variables
pub const ENV_PREFIX: &str = "WARDEN_";

/// Apply `WARDEN_*` variables from the process environment
pub fn apply_env_overrides(config: &mut SupervisorConfig) -> WardenResult<()> {
    apply_env_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`
///
/// Recognized keys: `WARDEN_TICK_INTERVAL`, `WARDEN_HEARTBEAT_TIMEOUT`,
/// `WARDEN_MAX_CONCURRENT_RECOVERIES`, `WARDEN_LOG_LEVEL`,
/// `WARDEN_LOG_FORMAT`, `WARDEN_STORAGE_DIR`.
pub fn apply_env_overrides_from<F>(config: &mut SupervisorConfig, lookup: F) -> WardenResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    if let Some(value) = var("TICK_INTERVAL") {
        config.tick_interval = parse_duration("WARDEN_TICK_INTERVAL", &value)?;
    }

    if let Some(value) = var("HEARTBEAT_TIMEOUT") {
        config.default_heartbeat_timeout = parse_duration("WARDEN_HEARTBEAT_TIMEOUT", &value)?;
    }

    if let Some(value) = var("MAX_CONCURRENT_RECOVERIES") {
        config.max_concurrent_recoveries = value.trim().parse().map_err(|_| {
            WardenError::config(format!(
                "Invalid WARDEN_MAX_CONCURRENT_RECOVERIES value '{}'",
                value
            ))
        })?;
    }

    if let Some(value) = var("LOG_LEVEL") {
        config.logging.level = value;
    }

    if let Some(value) = var("LOG_FORMAT") {
        config.logging.format = value.parse().map_err(WardenError::config)?;
    }

    if let Some(value) = var("STORAGE_DIR") {
        config.storage.dir = value;
    }

    Ok(())
}

fn parse_duration(key: &str, value: &str) -> WardenResult<Duration> {
    humantime_serde::re::humantime::parse_duration(value.trim())
        .map_err(|e| WardenError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

//! Configuration management for Warden

mod env_loader;
mod file_loader;
mod logging_config;
mod model;
mod validation;

pub use env_loader::{ENV_PREFIX, apply_env_overrides, apply_env_overrides_from};
pub use file_loader::load_from_file;
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{StorageConfig, SupervisorConfig};
pub use validation::ConfigValidator;

use crate::error::WardenResult;
use std::path::Path;

/// Load configuration from an optional file, apply `WARDEN_*` overrides and validate
pub fn load_config(path: Option<&Path>) -> WardenResult<SupervisorConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => SupervisorConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}

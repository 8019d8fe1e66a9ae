//! Configuration validation

use super::model::SupervisorConfig;
use crate::error::{WardenError, WardenResult};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration
    pub fn validate(config: &SupervisorConfig) -> WardenResult<()> {
        Self::validate_limits(config)?;
        Self::validate_policies(config)?;
        Ok(())
    }

    fn validate_limits(config: &SupervisorConfig) -> WardenResult<()> {
        if config.tick_interval.is_zero() {
            return Err(WardenError::config("tick_interval must be greater than zero"));
        }
        if config.default_heartbeat_timeout.is_zero() {
            return Err(WardenError::config(
                "default_heartbeat_timeout must be greater than zero",
            ));
        }
        if config.max_concurrent_recoveries == 0 {
            return Err(WardenError::config(
                "max_concurrent_recoveries must be at least 1",
            ));
        }
        if config.event_capacity == 0 {
            return Err(WardenError::config("event_capacity must be at least 1"));
        }
        Ok(())
    }

    fn validate_policies(config: &SupervisorConfig) -> WardenResult<()> {
        for (resource_type, policy) in &config.types {
            if resource_type.trim().is_empty() {
                return Err(WardenError::config("resource type names cannot be empty"));
            }
            policy.validate(resource_type)?;
        }
        Ok(())
    }
}

//! Per-type recovery strategy trait

use crate::error::StrategyError;
use crate::types::{Directive, InterventionOption, RecoveryAction, RecoveryTier, Resource};
use async_trait::async_trait;

/// Performs recovery actions for one resource type
///
/// Implementations only touch the underlying resource (process, container,
/// session). State bookkeeping is done by the supervisor, so a strategy must
/// never call back into it for the same resource while an action runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    /// Bring the resource back to a working state
    async fn restart(&self, resource: &Resource) -> Result<(), StrategyError>;

    /// Stop the resource gracefully
    async fn stop(&self, resource: &Resource) -> Result<(), StrategyError>;

    /// Terminate the resource forcefully
    async fn kill(&self, resource: &Resource) -> Result<(), StrategyError>;

    /// Run the action named by `tier`
    async fn recover(&self, resource: &Resource, tier: &RecoveryTier) -> Result<(), StrategyError> {
        match &tier.action {
            RecoveryAction::Restart | RecoveryAction::RestartClean => self.restart(resource).await,
            RecoveryAction::KillAndRespawn => {
                self.kill(resource).await?;
                self.restart(resource).await
            }
            RecoveryAction::Stop => self.stop(resource).await,
            RecoveryAction::Custom(name) => Err(StrategyError::UnsupportedAction(name.clone())),
        }
    }

    /// Options offered to the operator once recovery is exhausted
    fn intervention_options(&self, _resource: &Resource) -> Vec<InterventionOption> {
        InterventionOption::defaults()
    }

    /// Map a strategy-specific option to a built-in directive
    ///
    /// Only called for option ids other than `retry`, `stop` and `kill`.
    async fn custom_directive(
        &self,
        _resource: &Resource,
        option_id: &str,
        _extra: Option<serde_json::Value>,
    ) -> Result<Directive, StrategyError> {
        Err(StrategyError::UnsupportedDirective(option_id.to_string()))
    }
}

/// Strategy whose actions always succeed without doing anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStrategy;

#[async_trait]
impl RecoveryStrategy for NoopStrategy {
    async fn restart(&self, _resource: &Resource) -> Result<(), StrategyError> {
        Ok(())
    }

    async fn stop(&self, _resource: &Resource) -> Result<(), StrategyError> {
        Ok(())
    }

    async fn kill(&self, _resource: &Resource) -> Result<(), StrategyError> {
        Ok(())
    }
}

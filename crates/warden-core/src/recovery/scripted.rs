//! Strategy driven by a pre-recorded script
//!
//! Used by the `warden simulate` command and by tests to reproduce slow,
//! failing or panicking recoveries deterministically.

use super::strategy::RecoveryStrategy;
use crate::error::StrategyError;
use crate::types::{Directive, InterventionOption, RecoveryTier, Resource, ResourceId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Outcome of one scripted recovery attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Succeed,
    Fail(String),
    /// Never completes; only the tier timeout or cancellation ends it
    Hang,
    /// Succeed after sleeping
    Delay(Duration),
    /// Panic inside the attempt
    Panic(String),
}

/// A strategy invocation observed by [`ScriptedStrategy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyCall {
    pub resource_id: ResourceId,
    pub action: String,
}

#[derive(Debug, Default)]
struct Script {
    shared: VecDeque<ScriptStep>,
    per_resource: HashMap<ResourceId, VecDeque<ScriptStep>>,
}

/// Recovery strategy that replays queued [`ScriptStep`]s
#[derive(Debug)]
pub struct ScriptedStrategy {
    script: Mutex<Script>,
    fallback: ScriptStep,
    calls: Mutex<Vec<StrategyCall>>,
    extra_options: Vec<InterventionOption>,
    directives: HashMap<String, Directive>,
}

impl ScriptedStrategy {
    /// Strategy that succeeds whenever its script is empty
    pub fn new() -> Self {
        Self::with_fallback(ScriptStep::Succeed)
    }

    pub fn with_fallback(fallback: ScriptStep) -> Self {
        Self {
            script: Mutex::new(Script::default()),
            fallback,
            calls: Mutex::new(Vec::new()),
            extra_options: Vec::new(),
            directives: HashMap::new(),
        }
    }

    /// Offer an extra intervention option mapped onto a built-in directive
    pub fn with_option(mut self, option: InterventionOption, directive: Directive) -> Self {
        self.directives.insert(option.id.clone(), directive);
        self.extra_options.push(option);
        self
    }

    /// Queue steps consumed by any resource
    pub fn push_steps(&self, steps: impl IntoIterator<Item = ScriptStep>) {
        self.script.lock().shared.extend(steps);
    }

    /// Queue steps consumed only by `resource_id`, ahead of the shared queue
    pub fn push_steps_for(&self, resource_id: &str, steps: impl IntoIterator<Item = ScriptStep>) {
        self.script
            .lock()
            .per_resource
            .entry(resource_id.to_string())
            .or_default()
            .extend(steps);
    }

    /// Every call seen so far, in order
    pub fn calls(&self) -> Vec<StrategyCall> {
        self.calls.lock().clone()
    }

    /// Calls seen for one resource
    pub fn calls_for(&self, resource_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.resource_id == resource_id)
            .map(|c| c.action.clone())
            .collect()
    }

    fn record(&self, resource: &Resource, action: &str) {
        self.calls.lock().push(StrategyCall {
            resource_id: resource.id.clone(),
            action: action.to_string(),
        });
    }

    fn next_step(&self, resource_id: &str) -> ScriptStep {
        let mut script = self.script.lock();
        let own = script
            .per_resource
            .get_mut(resource_id)
            .and_then(|queue| queue.pop_front());
        own.or_else(|| script.shared.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn play(step: ScriptStep) -> Result<(), StrategyError> {
        match step {
            ScriptStep::Succeed => Ok(()),
            ScriptStep::Fail(message) => Err(StrategyError::Failed(message)),
            ScriptStep::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            ScriptStep::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            ScriptStep::Panic(message) => panic!("{}", message),
        }
    }
}

impl Default for ScriptedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecoveryStrategy for ScriptedStrategy {
    async fn restart(&self, resource: &Resource) -> Result<(), StrategyError> {
        self.record(resource, "restart");
        Ok(())
    }

    async fn stop(&self, resource: &Resource) -> Result<(), StrategyError> {
        self.record(resource, "stop");
        Ok(())
    }

    async fn kill(&self, resource: &Resource) -> Result<(), StrategyError> {
        self.record(resource, "kill");
        Ok(())
    }

    async fn recover(&self, resource: &Resource, tier: &RecoveryTier) -> Result<(), StrategyError> {
        self.record(resource, tier.action.as_str());
        let step = self.next_step(&resource.id);
        Self::play(step).await
    }

    fn intervention_options(&self, _resource: &Resource) -> Vec<InterventionOption> {
        let mut options = InterventionOption::defaults();
        options.extend(self.extra_options.iter().cloned());
        options
    }

    async fn custom_directive(
        &self,
        _resource: &Resource,
        option_id: &str,
        _extra: Option<serde_json::Value>,
    ) -> Result<Directive, StrategyError> {
        self.directives
            .get(option_id)
            .copied()
            .ok_or_else(|| StrategyError::UnsupportedDirective(option_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceConfig;
    use chrono::Utc;

    fn resource(id: &str) -> Resource {
        Resource::new("container", ResourceConfig::new().with_id(id), Utc::now())
    }

    fn tier(action: &str) -> RecoveryTier {
        RecoveryTier::new(0, action, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_steps_replay_in_order() {
        let strategy = ScriptedStrategy::new();
        strategy.push_steps([ScriptStep::Fail("boom".to_string()), ScriptStep::Succeed]);

        let r = resource("c1");
        assert_eq!(
            strategy.recover(&r, &tier("restart")).await,
            Err(StrategyError::Failed("boom".to_string()))
        );
        assert!(strategy.recover(&r, &tier("restart_clean")).await.is_ok());
        // script exhausted, fallback applies
        assert!(strategy.recover(&r, &tier("restart")).await.is_ok());
        assert_eq!(
            strategy.calls_for("c1"),
            vec!["restart", "restart_clean", "restart"]
        );
    }

    #[tokio::test]
    async fn test_per_resource_steps_take_priority() {
        let strategy = ScriptedStrategy::with_fallback(ScriptStep::Fail("fallback".to_string()));
        strategy.push_steps([ScriptStep::Succeed]);
        strategy.push_steps_for("c2", [ScriptStep::Fail("own".to_string())]);

        assert_eq!(
            strategy.recover(&resource("c2"), &tier("restart")).await,
            Err(StrategyError::Failed("own".to_string()))
        );
        assert!(strategy.recover(&resource("c1"), &tier("restart")).await.is_ok());
        assert_eq!(
            strategy.recover(&resource("c1"), &tier("restart")).await,
            Err(StrategyError::Failed("fallback".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_never_finishes() {
        let strategy = ScriptedStrategy::with_fallback(ScriptStep::Hang);
        let r = resource("c1");
        let result =
            tokio::time::timeout(Duration::from_secs(5), strategy.recover(&r, &tier("restart"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_extra_option_maps_to_directive() {
        let strategy = ScriptedStrategy::new().with_option(
            InterventionOption::new("rollback", "Rollback", "Restore the last image", true),
            Directive::Kill,
        );
        let r = resource("c1");
        assert_eq!(strategy.intervention_options(&r).len(), 4);
        assert_eq!(
            strategy.custom_directive(&r, "rollback", None).await,
            Ok(Directive::Kill)
        );
        assert!(strategy.custom_directive(&r, "reboot", None).await.is_err());
    }
}

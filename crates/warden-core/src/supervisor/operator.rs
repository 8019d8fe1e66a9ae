//! Operator-facing supervisor calls: retry, stop, kill and interventions

use super::Supervisor;
use crate::error::{StrategyError, WardenError, WardenResult};
use crate::persistence::SnapshotStore;
use crate::recovery::{DispatchMode, DispatchOutcome};
use crate::types::{Directive, ResourceState, StateTransition, UserInterventionRequest};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

impl Supervisor {
    /// Re-run recovery for a `stuck` resource at its current tier
    ///
    /// An open intervention for the resource is closed with `retry`.
    pub fn retry_resource(&self, id: &str) -> WardenResult<DispatchOutcome> {
        let resource = self.registry.get(id)?;
        if resource.state != ResourceState::Stuck {
            return Err(WardenError::invalid_transition(
                id,
                resource.state,
                ResourceState::Recovering,
            ));
        }
        if self.strategies.get(&resource.resource_type).is_none() {
            return Err(WardenError::strategy_not_registered(&resource.resource_type));
        }
        if self.engine.is_in_flight(id) {
            return Err(WardenError::RecoveryInFlight {
                resource_id: id.to_string(),
            });
        }

        self.interventions
            .close_for_resource(id, Directive::Retry.as_str());
        tracing::info!(resource_id = %id, "operator retry");
        self.engine.dispatch(id, DispatchMode::Manual)
    }

    /// Gracefully stop a resource and mark it `failed`
    pub async fn stop_resource(&self, id: &str) -> WardenResult<StateTransition> {
        self.terminate(id, Directive::Stop, "stopped by operator".to_string())
            .await
    }

    /// Forcefully terminate a resource and mark it `failed`
    pub async fn kill_resource(&self, id: &str) -> WardenResult<StateTransition> {
        self.terminate(id, Directive::Kill, "killed by operator".to_string())
            .await
    }

    /// Apply `-> failed` and cancel recovery under one lock, then ask the strategy to stop or kill
    ///
    /// The strategy call is best effort; its failure is logged and the
    /// resource stays `failed`.
    async fn terminate(
        &self,
        id: &str,
        directive: Directive,
        reason: String,
    ) -> WardenResult<StateTransition> {
        let (transition, snapshot) = self.registry.with_resource(id, |resource| {
            let transition =
                self.registry
                    .apply_transition(resource, ResourceState::Failed, reason)?;
            // Under the lock, so no attempt can be dispatched in between
            self.engine.cancel(id);
            Ok((transition, resource.clone()))
        })?;
        self.interventions
            .close_for_resource(id, directive.as_str());

        let strategy = self.strategies.strategy_or_noop(&snapshot.resource_type);
        let deadline = self.action_deadline(&snapshot.resource_type);
        let action = async {
            match directive {
                Directive::Kill => strategy.kill(&snapshot).await,
                Directive::Stop | Directive::Retry => strategy.stop(&snapshot).await,
            }
        };

        match tokio::time::timeout(deadline, AssertUnwindSafe(action).catch_unwind()).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(resource_id = %id, directive = %directive, "resource terminated");
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(resource_id = %id, directive = %directive, error = %e, "strategy termination failed");
            }
            Ok(Err(_)) => {
                tracing::error!(resource_id = %id, directive = %directive, "strategy panicked during termination");
            }
            Err(_) => {
                tracing::warn!(resource_id = %id, directive = %directive, deadline = ?deadline, "strategy termination timed out");
            }
        }

        Ok(transition)
    }

    /// Longest tier timeout of the type, or the default heartbeat timeout
    fn action_deadline(&self, resource_type: &str) -> Duration {
        self.strategies
            .policy(resource_type)
            .and_then(|policy| policy.tiers.iter().map(|t| t.timeout).max())
            .unwrap_or(self.config.default_heartbeat_timeout)
    }

    /// Unresolved intervention requests, oldest first
    pub fn get_pending_interventions(&self) -> Vec<UserInterventionRequest> {
        self.interventions.pending()
    }

    pub fn get_intervention(&self, request_id: &str) -> WardenResult<UserInterventionRequest> {
        self.interventions.get(request_id)
    }

    /// All requests ever raised for a resource
    pub fn get_resource_interventions(&self, id: &str) -> Vec<UserInterventionRequest> {
        self.interventions.for_resource(id)
    }

    /// Record the operator's choice and apply its directive
    ///
    /// Options other than `retry`, `stop` and `kill` are mapped by the
    /// resource's strategy first. The resolution is recorded before the
    /// directive runs; if the directive then fails its error is returned and
    /// the request stays resolved.
    pub async fn resolve_intervention(
        &self,
        request_id: &str,
        option_id: &str,
        extra: Option<serde_json::Value>,
    ) -> WardenResult<UserInterventionRequest> {
        let request = self.interventions.get(request_id)?;
        if !request.is_open() {
            return Err(WardenError::InterventionAlreadyResolved {
                request_id: request_id.to_string(),
            });
        }
        if request.option(option_id).is_none() {
            return Err(WardenError::InvalidOption {
                request_id: request_id.to_string(),
                option_id: option_id.to_string(),
            });
        }

        let directive = match Directive::from_option_id(option_id) {
            Some(directive) => directive,
            None => {
                let resource = self.registry.get(&request.resource_id)?;
                let strategy = self.strategies.strategy_or_noop(&resource.resource_type);
                strategy
                    .custom_directive(&resource, option_id, extra.clone())
                    .await
                    .map_err(|e| match e {
                        StrategyError::UnsupportedDirective(_) => WardenError::InvalidOption {
                            request_id: request_id.to_string(),
                            option_id: option_id.to_string(),
                        },
                        other => WardenError::recovery_failed(&request.resource_id, other.to_string()),
                    })?
            }
        };

        let resolved = self.interventions.resolve(request_id, option_id, extra)?;
        let resource_id = resolved.resource_id.as_str();

        match directive {
            Directive::Retry => {
                self.engine.dispatch(resource_id, DispatchMode::Manual)?;
            }
            Directive::Stop | Directive::Kill => {
                let reason = format!("{} via intervention {}", directive, request_id);
                self.terminate(resource_id, directive, reason).await?;
            }
        }

        Ok(resolved)
    }

    /// Save every resource record to `store`
    pub async fn persist_snapshot(&self, store: &dyn SnapshotStore) -> WardenResult<usize> {
        let resources = self.registry.list_all();
        store.save_all(&resources).await?;
        self.registry.history().flush().await;
        tracing::info!(resources = resources.len(), "snapshot persisted");
        Ok(resources.len())
    }

    /// Reload resource records saved by [`persist_snapshot`](Self::persist_snapshot)
    ///
    /// Records already tracked are skipped. Returns the number restored.
    pub async fn restore(&self, store: &dyn SnapshotStore) -> WardenResult<usize> {
        let mut restored = 0;
        for resource in store.load_all().await? {
            let id = resource.id.clone();
            match self.registry.restore(resource) {
                Ok(_) => restored += 1,
                Err(e) => tracing::warn!(resource_id = %id, error = %e, "resource not restored"),
            }
        }
        tracing::info!(restored, "snapshot restored");
        Ok(restored)
    }
}

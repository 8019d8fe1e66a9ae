//! Concurrent store of resource records

use super::history::HistoryLog;
use super::validator::TransitionValidator;
use crate::clock::Clock;
use crate::error::{WardenError, WardenResult};
use crate::events::{EventBus, SupervisorEvent};
use crate::types::{Resource, ResourceConfig, ResourceId, ResourceState, StateTransition};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;

/// Authoritative store of resources and their lifecycle state
///
/// Each record sits behind its own lock, so writers to one resource are
/// serialized while different resources never contend. The per-resource lock
/// is never held across an await point.
pub struct ResourceRegistry {
    resources: DashMap<ResourceId, Arc<Mutex<Resource>>>,
    history: Arc<HistoryLog>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl ResourceRegistry {
    pub fn new(history: Arc<HistoryLog>, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            resources: DashMap::new(),
            history,
            events,
            clock,
        }
    }

    pub fn history(&self) -> &Arc<HistoryLog> {
        &self.history
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Register a new resource, starting it unless `config.auto_start` is off
    pub fn spawn(&self, resource_type: &str, config: ResourceConfig) -> WardenResult<ResourceId> {
        if resource_type.trim().is_empty() {
            return Err(WardenError::invalid_input("resource type cannot be empty"));
        }
        if let Some(id) = &config.id {
            if id.trim().is_empty() {
                return Err(WardenError::invalid_input("resource id cannot be empty"));
            }
        }

        let auto_start = config.auto_start;
        let resource = Resource::new(resource_type, config, self.clock.now());
        let id = resource.id.clone();
        // Removed resources keep their history; a reused id would splice two lives
        if self.history.contains(&id) {
            return Err(WardenError::invalid_input(format!(
                "resource id '{}' was used by a removed resource",
                id
            )));
        }

        match self.resources.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(WardenError::invalid_input(format!(
                    "resource '{}' already exists",
                    id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(resource)));
            }
        }

        tracing::info!(resource_id = %id, resource_type, "resource spawned");

        if auto_start {
            self.start(&id)?;
        }
        Ok(id)
    }

    /// Apply `idle -> running`
    pub fn start(&self, id: &str) -> WardenResult<StateTransition> {
        self.with_resource(id, |resource| {
            let transition = self.apply_transition(resource, ResourceState::Running, "spawned")?;
            resource.last_heartbeat_at = transition.timestamp;
            Ok(transition)
        })
    }

    /// Snapshot of one resource
    pub fn get(&self, id: &str) -> WardenResult<Resource> {
        self.with_resource(id, |resource| Ok(resource.clone()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Refresh the heartbeat; never changes state
    pub fn heartbeat(&self, id: &str) -> WardenResult<()> {
        self.with_resource(id, |resource| {
            resource.last_heartbeat_at = self.clock.now();
            tracing::trace!(resource_id = %resource.id, state = %resource.state, "heartbeat");
            Ok(())
        })
    }

    /// Update observability fields; never changes state
    pub fn update_progress(
        &self,
        id: &str,
        progress: Option<f32>,
        substate: Option<String>,
    ) -> WardenResult<()> {
        if let Some(p) = progress {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(WardenError::invalid_input(format!(
                    "progress must be within 0.0..=1.0, got {}",
                    p
                )));
            }
        }

        self.with_resource(id, |resource| {
            if progress.is_some() {
                resource.progress = progress;
            }
            if substate.is_some() {
                resource.substate = substate;
            }
            Ok(())
        })
    }

    /// Owner signal: the work finished
    pub fn complete(&self, id: &str) -> WardenResult<StateTransition> {
        self.complete_with(id, |_| {})
    }

    /// [`complete`](Self::complete), running `on_applied` under the resource
    /// lock once the transition is recorded
    pub fn complete_with(
        &self,
        id: &str,
        on_applied: impl FnOnce(&Resource),
    ) -> WardenResult<StateTransition> {
        self.with_resource(id, |resource| {
            let transition =
                self.apply_transition(resource, ResourceState::Completed, "completed by owner")?;
            on_applied(resource);
            Ok(transition)
        })
    }

    /// Owner signal: the work failed on its own
    pub fn fail_naturally(&self, id: &str, error: &str) -> WardenResult<StateTransition> {
        self.fail_naturally_with(id, error, |_| {})
    }

    /// [`fail_naturally`](Self::fail_naturally) with an under-lock hook
    pub fn fail_naturally_with(
        &self,
        id: &str,
        error: &str,
        on_applied: impl FnOnce(&Resource),
    ) -> WardenResult<StateTransition> {
        self.with_resource(id, |resource| {
            let transition =
                self.apply_transition(resource, ResourceState::Failed, format!("failed: {}", error))?;
            resource.last_error = Some(error.to_string());
            on_applied(resource);
            Ok(transition)
        })
    }

    /// Return every `recovering` resource to `stuck`
    ///
    /// Used when the attempts behind them were abandoned. Returns how many
    /// resources moved.
    pub fn interrupt_recoveries(&self, reason: &str) -> usize {
        let mut interrupted = 0;
        for resource in self.list_in_state(ResourceState::Recovering) {
            let moved = self.with_resource(&resource.id, |resource| {
                if resource.state != ResourceState::Recovering {
                    return Ok(false);
                }
                self.apply_transition(resource, ResourceState::Stuck, reason)?;
                Ok(true)
            });
            match moved {
                Ok(true) => interrupted += 1,
                Ok(false) | Err(WardenError::NotFound { .. }) => {}
                Err(e) => tracing::warn!(resource_id = %resource.id, error = %e, "recovery not interrupted"),
            }
        }
        interrupted
    }

    /// Apply a single validated edge
    pub fn transition(
        &self,
        id: &str,
        to: ResourceState,
        reason: impl Into<String>,
    ) -> WardenResult<StateTransition> {
        let reason = reason.into();
        self.with_resource(id, |resource| self.apply_transition(resource, to, reason))
    }

    /// Run `f` with exclusive access to one resource
    pub(crate) fn with_resource<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Resource) -> WardenResult<R>,
    ) -> WardenResult<R> {
        // Clone the handle first so the map shard is not held while locked
        let handle = self
            .resources
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| WardenError::resource_not_found(id))?;
        let mut resource = handle.lock();
        f(&mut resource)
    }

    /// Validate, log-ahead and apply `to` on a locked resource
    pub(crate) fn apply_transition(
        &self,
        resource: &mut Resource,
        to: ResourceState,
        reason: impl Into<String>,
    ) -> WardenResult<StateTransition> {
        let from = resource.state;
        TransitionValidator::validate(&resource.id, from, to)?;

        let transition = self.history.append(StateTransition::new(
            resource.id.clone(),
            from,
            to,
            self.clock.now(),
            reason,
        ));

        resource.state = to;
        resource.updated_at = transition.timestamp;

        tracing::info!(
            resource_id = %resource.id,
            resource_type = %resource.resource_type,
            from = %from,
            to = %to,
            reason = %transition.reason,
            "state transition"
        );
        self.events
            .publish(SupervisorEvent::StateChanged(transition.clone()));

        Ok(transition)
    }

    /// Snapshot of every resource, oldest first
    pub fn list_all(&self) -> Vec<Resource> {
        let handles: Vec<Arc<Mutex<Resource>>> =
            self.resources.iter().map(|e| e.value().clone()).collect();
        let mut all: Vec<Resource> = handles.iter().map(|h| h.lock().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn list_by_type(&self, resource_type: &str) -> Vec<Resource> {
        self.list_all()
            .into_iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    pub fn list_in_state(&self, state: ResourceState) -> Vec<Resource> {
        self.list_all()
            .into_iter()
            .filter(|r| r.state == state)
            .collect()
    }

    pub fn list_stuck(&self) -> Vec<Resource> {
        self.list_in_state(ResourceState::Stuck)
    }

    /// Drop a terminal resource; its history is kept
    pub fn remove(&self, id: &str) -> WardenResult<Resource> {
        let snapshot = self.with_resource(id, |resource| {
            if resource.state.is_terminal() {
                Ok(resource.clone())
            } else {
                Err(WardenError::NotTerminal {
                    resource_id: resource.id.clone(),
                    state: resource.state,
                })
            }
        })?;
        self.resources.remove(id);
        tracing::debug!(resource_id = %id, "resource removed");
        Ok(snapshot)
    }

    /// Re-insert a record loaded from a snapshot
    ///
    /// A record saved mid-recovery comes back `stuck`; running records get a
    /// fresh heartbeat baseline.
    pub fn restore(&self, mut resource: Resource) -> WardenResult<ResourceId> {
        let id = resource.id.clone();
        if self.resources.contains_key(&id) {
            return Err(WardenError::invalid_input(format!(
                "resource '{}' already exists",
                id
            )));
        }

        match resource.state {
            ResourceState::Recovering => {
                self.apply_transition(
                    &mut resource,
                    ResourceState::Stuck,
                    "recovery interrupted by supervisor restart",
                )?;
            }
            ResourceState::Running => {
                resource.last_heartbeat_at = self.clock.now();
            }
            _ => {}
        }

        match self.resources.entry(id.clone()) {
            Entry::Occupied(_) => Err(WardenError::invalid_input(format!(
                "resource '{}' already exists",
                id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(resource)));
                Ok(id)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources.len())
            .finish()
    }
}

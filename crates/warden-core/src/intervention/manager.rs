//! Intervention request storage and resolution

use crate::clock::Clock;
use crate::error::{WardenError, WardenResult};
use crate::events::{EventBus, SupervisorEvent};
use crate::types::{
    FailureContext, InterventionOption, InterventionResolution, RequestId, Resource, ResourceId,
    UserInterventionRequest,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use uuid::Uuid;

/// Creates, queues and resolves operator requests
pub struct InterventionManager {
    requests: DashMap<RequestId, UserInterventionRequest>,
    open_by_resource: DashMap<ResourceId, RequestId>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl InterventionManager {
    pub fn new(events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            requests: DashMap::new(),
            open_by_resource: DashMap::new(),
            events,
            clock,
        }
    }

    /// Open a request for `resource` unless one is already open
    ///
    /// Returns the open request and whether it was created by this call.
    pub fn open_if_absent(
        &self,
        resource: &Resource,
        failure_context: FailureContext,
        attempted_tiers: Vec<u32>,
        options: Vec<InterventionOption>,
    ) -> (UserInterventionRequest, bool) {
        // Lock order: open_by_resource, then requests
        match self.open_by_resource.entry(resource.id.clone()) {
            Entry::Occupied(mut open) => {
                if let Some(existing) = self.requests.get(open.get()) {
                    if existing.is_open() {
                        return (existing.value().clone(), false);
                    }
                }
                // Resolved by a close that has not dropped the index yet
                let request = self.new_request(resource, failure_context, attempted_tiers, options);
                self.requests.insert(request.id.clone(), request.clone());
                open.insert(request.id.clone());
                self.announce(&request);
                (request, true)
            }
            Entry::Vacant(slot) => {
                let request = self.new_request(resource, failure_context, attempted_tiers, options);
                self.requests.insert(request.id.clone(), request.clone());
                slot.insert(request.id.clone());
                self.announce(&request);
                (request, true)
            }
        }
    }

    fn new_request(
        &self,
        resource: &Resource,
        failure_context: FailureContext,
        attempted_tiers: Vec<u32>,
        options: Vec<InterventionOption>,
    ) -> UserInterventionRequest {
        UserInterventionRequest {
            id: Uuid::new_v4().to_string(),
            resource_id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            failure_context,
            attempted_tiers,
            options,
            created_at: self.clock.now(),
            resolved_at: None,
            resolution: None,
        }
    }

    fn announce(&self, request: &UserInterventionRequest) {
        tracing::warn!(
            request_id = %request.id,
            resource_id = %request.resource_id,
            resource_type = %request.resource_type,
            error = %request.failure_context.error,
            attempted_tiers = ?request.attempted_tiers,
            "intervention required"
        );
        self.events.publish(SupervisorEvent::InterventionOpened {
            request_id: request.id.clone(),
            resource_id: request.resource_id.clone(),
        });
    }

    /// Record the operator's choice on an open request
    ///
    /// Fails without side effects when the request is unknown, already
    /// resolved, or does not offer `option_id`.
    pub fn resolve(
        &self,
        request_id: &str,
        option_id: &str,
        extra: Option<serde_json::Value>,
    ) -> WardenResult<UserInterventionRequest> {
        self.close(request_id, option_id, extra, true)
    }

    /// Close the open request of a resource, if any, without option checks
    pub fn close_for_resource(
        &self,
        resource_id: &str,
        option_id: &str,
    ) -> Option<UserInterventionRequest> {
        let request_id = self.open_by_resource.get(resource_id)?.value().clone();
        self.close(&request_id, option_id, None, false).ok()
    }

    /// Close a dead resource's open request with the `superseded` resolution
    pub fn supersede(&self, resource_id: &str) -> Option<UserInterventionRequest> {
        self.close_for_resource(resource_id, InterventionResolution::SUPERSEDED)
    }

    fn close(
        &self,
        request_id: &str,
        option_id: &str,
        extra: Option<serde_json::Value>,
        check_option: bool,
    ) -> WardenResult<UserInterventionRequest> {
        let resolved = {
            let mut request = self
                .requests
                .get_mut(request_id)
                .ok_or_else(|| WardenError::intervention_not_found(request_id))?;

            if !request.is_open() {
                return Err(WardenError::InterventionAlreadyResolved {
                    request_id: request_id.to_string(),
                });
            }
            if check_option && request.option(option_id).is_none() {
                return Err(WardenError::InvalidOption {
                    request_id: request_id.to_string(),
                    option_id: option_id.to_string(),
                });
            }

            request.resolved_at = Some(self.clock.now());
            request.resolution = Some(InterventionResolution {
                option_id: option_id.to_string(),
                extra,
            });
            request.clone()
        };

        self.open_by_resource
            .remove_if(&resolved.resource_id, |_, open| open == request_id);

        tracing::info!(
            request_id = %resolved.id,
            resource_id = %resolved.resource_id,
            option_id,
            "intervention resolved"
        );
        self.events.publish(SupervisorEvent::InterventionResolved {
            request_id: resolved.id.clone(),
            resource_id: resolved.resource_id.clone(),
            option_id: option_id.to_string(),
        });

        Ok(resolved)
    }

    pub fn get(&self, request_id: &str) -> WardenResult<UserInterventionRequest> {
        self.requests
            .get(request_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| WardenError::intervention_not_found(request_id))
    }

    /// Open request for a resource
    pub fn open_for(&self, resource_id: &str) -> Option<UserInterventionRequest> {
        let request_id = self.open_by_resource.get(resource_id)?.value().clone();
        self.requests
            .get(&request_id)
            .filter(|r| r.is_open())
            .map(|r| r.value().clone())
    }

    pub fn has_open(&self, resource_id: &str) -> bool {
        self.open_for(resource_id).is_some()
    }

    /// Unresolved requests, oldest first
    pub fn pending(&self) -> Vec<UserInterventionRequest> {
        let mut pending: Vec<UserInterventionRequest> = self
            .requests
            .iter()
            .filter(|r| r.value().is_open())
            .map(|r| r.value().clone())
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending
    }

    /// Every request ever raised for a resource, oldest first
    pub fn for_resource(&self, resource_id: &str) -> Vec<UserInterventionRequest> {
        let mut requests: Vec<UserInterventionRequest> = self
            .requests
            .iter()
            .filter(|r| r.value().resource_id == resource_id)
            .map(|r| r.value().clone())
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        requests
    }

    pub fn pending_count(&self) -> usize {
        self.open_by_resource.len()
    }
}

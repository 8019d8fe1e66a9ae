//! Supervisor event stream for observers

use crate::types::{RequestId, ResourceId, StateTransition};
use tokio::sync::broadcast;

/// Notification published by the supervisor
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    /// A lifecycle edge was applied
    StateChanged(StateTransition),
    /// A recovery tier was dispatched
    RecoveryDispatched {
        resource_id: ResourceId,
        tier: u32,
        attempt: u32,
    },
    /// A recovery attempt finished and its result was applied
    RecoveryFinished {
        resource_id: ResourceId,
        tier: u32,
        success: bool,
    },
    /// An intervention request was opened
    InterventionOpened {
        request_id: RequestId,
        resource_id: ResourceId,
    },
    /// An intervention request was resolved
    InterventionResolved {
        request_id: RequestId,
        resource_id: ResourceId,
        option_id: String,
    },
    /// The health monitor loop started
    MonitorStarted,
    /// The health monitor loop stopped
    MonitorStopped,
}

/// Cloneable broadcast sender shared by all components
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SupervisorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; dropped when nobody listens
    pub fn publish(&self, event: SupervisorEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

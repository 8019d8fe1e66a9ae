//! Append-only per-resource transition log

use crate::persistence::HistorySink;
use crate::types::{ResourceId, StateTransition};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

enum SinkCommand {
    Append(StateTransition),
    Flush(oneshot::Sender<()>),
}

/// Shared transition log
///
/// Entries are never mutated or reordered. Timestamps are strictly increasing
/// per resource. With a [`HistorySink`] attached, every entry is forwarded in
/// append order to a background writer.
#[derive(Default)]
pub struct HistoryLog {
    entries: DashMap<ResourceId, Vec<StateTransition>>,
    sink: Option<mpsc::UnboundedSender<SinkCommand>>,
}

impl HistoryLog {
    /// In-memory log
    pub fn new() -> Self {
        Self::default()
    }

    /// Log that also persists to `sink`
    ///
    /// Spawns the writer task, so this must be called inside a Tokio runtime.
    pub fn with_sink(sink: Arc<dyn HistorySink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SinkCommand>();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    SinkCommand::Append(transition) => {
                        if let Err(e) = sink.append(&transition).await {
                            tracing::error!(
                                resource_id = %transition.resource_id,
                                error = %e,
                                "failed to persist state transition"
                            );
                        }
                    }
                    SinkCommand::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self {
            entries: DashMap::new(),
            sink: Some(tx),
        }
    }

    /// Append a transition, returning the entry as stored
    pub(crate) fn append(&self, mut transition: StateTransition) -> StateTransition {
        {
            let mut entries = self
                .entries
                .entry(transition.resource_id.clone())
                .or_default();
            if let Some(last) = entries.last() {
                if transition.timestamp <= last.timestamp {
                    transition.timestamp = last.timestamp + chrono::Duration::microseconds(1);
                }
            }
            entries.push(transition.clone());

            // Sent under the entry lock so the sink sees per-resource order
            if let Some(sink) = &self.sink {
                let _ = sink.send(SinkCommand::Append(transition.clone()));
            }
        }
        transition
    }

    /// Transitions of one resource, oldest first
    pub fn history(&self, resource_id: &str) -> Vec<StateTransition> {
        self.entries
            .get(resource_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Most recent transition of one resource
    pub fn last(&self, resource_id: &str) -> Option<StateTransition> {
        self.entries
            .get(resource_id)
            .and_then(|e| e.value().last().cloned())
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.entries.contains_key(resource_id)
    }

    /// Total number of recorded transitions
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every transition appended so far reached the sink
    pub async fn flush(&self) {
        if let Some(sink) = &self.sink {
            let (tx, rx) = oneshot::channel();
            if sink.send(SinkCommand::Flush(tx)).is_ok() {
                let _ = rx.await;
            }
        }
    }
}

impl std::fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLog")
            .field("resources", &self.entries.len())
            .field("persisted", &self.sink.is_some())
            .finish()
    }
}

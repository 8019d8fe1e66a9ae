//! Aggregate counts over all resources

use crate::types::{Resource, ResourceState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-type breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
}

/// Snapshot of supervisor-wide resource counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorStats {
    pub idle: usize,
    pub running: usize,
    pub stuck: usize,
    pub recovering: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    /// idle + running + completed
    pub healthy: usize,
    /// stuck + recovering + failed
    pub degraded: usize,
    pub pending_interventions: usize,
    pub by_type: BTreeMap<String, TypeStats>,
}

impl SupervisorStats {
    pub fn count(&self, state: ResourceState) -> usize {
        match state {
            ResourceState::Idle => self.idle,
            ResourceState::Running => self.running,
            ResourceState::Stuck => self.stuck,
            ResourceState::Recovering => self.recovering,
            ResourceState::Completed => self.completed,
            ResourceState::Failed => self.failed,
        }
    }
}

/// Folds resource snapshots into [`SupervisorStats`]
pub struct StatsAggregator;

impl StatsAggregator {
    pub fn collect(resources: &[Resource], pending_interventions: usize) -> SupervisorStats {
        let mut stats = SupervisorStats {
            pending_interventions,
            ..Default::default()
        };

        for resource in resources {
            match resource.state {
                ResourceState::Idle => stats.idle += 1,
                ResourceState::Running => stats.running += 1,
                ResourceState::Stuck => stats.stuck += 1,
                ResourceState::Recovering => stats.recovering += 1,
                ResourceState::Completed => stats.completed += 1,
                ResourceState::Failed => stats.failed += 1,
            }

            let per_type = stats
                .by_type
                .entry(resource.resource_type.clone())
                .or_default();
            per_type.total += 1;
            if resource.state.is_healthy() {
                per_type.healthy += 1;
            } else {
                per_type.degraded += 1;
            }
        }

        stats.total = resources.len();
        stats.healthy = stats.idle + stats.running + stats.completed;
        stats.degraded = stats.stuck + stats.recovering + stats.failed;
        stats
    }
}

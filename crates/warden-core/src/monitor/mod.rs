//! Health monitoring and aggregate statistics

mod health;
mod stats;

pub use health::{HealthMonitor, TickReport};
pub use stats::{StatsAggregator, SupervisorStats, TypeStats};

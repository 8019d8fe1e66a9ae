//! Warden Core Library
//!
//! This crate provides the resource lifecycle supervisor: a registry of
//! long-running resources, a heartbeat watchdog, tiered recovery through
//! per-type strategies, and an operator intervention queue.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod intervention;
pub mod lifecycle;
pub mod monitor;
pub mod persistence;
pub mod recovery;
pub mod supervisor;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LogFormat, LoggingConfig, StorageConfig, SupervisorConfig, load_config};
pub use error::{StrategyError, WardenError, WardenResult};
pub use events::{EventBus, SupervisorEvent};
pub use intervention::InterventionManager;
pub use lifecycle::{HistoryLog, ResourceRegistry, TransitionValidator};
pub use monitor::{HealthMonitor, StatsAggregator, SupervisorStats, TickReport};
pub use persistence::{
    HistorySink, MemorySnapshotStore, PersistenceError, PersistenceResult, SnapshotStore,
};
pub use recovery::{
    DispatchMode, DispatchOutcome, NoopStrategy, RecoveryEngine, RecoveryStrategy,
    RecoveryStrategyRegistry, ScriptStep, ScriptedStrategy,
};
pub use supervisor::{Supervisor, SupervisorBuilder};
pub use types::*;

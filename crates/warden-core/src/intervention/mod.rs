//! Operator intervention queue
//!
//! At most one request is open per resource. Opening is a compare-and-set on
//! the resource id and resolution is recorded exactly once.

mod manager;

pub use manager::InterventionManager;

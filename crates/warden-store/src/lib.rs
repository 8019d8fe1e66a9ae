//! File-backed persistence for Warden
//!
//! This crate provides the on-disk implementations of the persistence seams
//! defined in `warden-core`:
//! - [`JsonlHistorySink`]: one append-only JSON-lines file per resource
//! - [`JsonSnapshotStore`]: one JSON document per resource record

mod history;
mod paths;
mod snapshot;

pub use history::JsonlHistorySink;
pub use snapshot::JsonSnapshotStore;

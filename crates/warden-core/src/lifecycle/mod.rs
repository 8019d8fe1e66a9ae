//! Resource lifecycle: legal edges, the transition log and the registry
//!
//! Every state change goes through [`ResourceRegistry`], which validates the
//! edge with [`TransitionValidator`] and appends it to the [`HistoryLog`]
//! before the new state becomes visible.

mod history;
mod registry;
mod validator;

pub use history::HistoryLog;
pub use registry::ResourceRegistry;
pub use validator::TransitionValidator;

//! Core data types: the state store, history, transition context and
//! snapshots.

mod context;
mod history;
mod snapshot;
mod store;

pub use context::{Modification, TransitionContext, TransitionTrigger};
pub use history::{HistoryEntry, StageHistory};
pub use snapshot::StageSnapshot;
pub use store::{StateStore, StoreCheckpoint, TransitioningGuard};

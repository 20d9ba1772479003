//! The single source of truth for one engine instance.

use super::history::{HistoryEntry, StageHistory};
use parking_lot::RwLock;
use serde_json::Value;

/// Current stage, payload, transitioning flag and history.
#[derive(Debug, Clone)]
pub struct StateStore {
    current_stage: String,
    data: Value,
    transitioning: bool,
    history: StageHistory,
}

/// Saved store content used to undo a commit.
#[derive(Debug, Clone)]
pub struct StoreCheckpoint {
    current_stage: String,
    data: Value,
    history: StageHistory,
}

impl StateStore {
    /// Creates a store positioned on `stage` with an empty history.
    #[must_use]
    pub fn new(stage: impl Into<String>, data: Value, history_limit: Option<usize>) -> Self {
        Self {
            current_stage: stage.into(),
            data,
            transitioning: false,
            history: StageHistory::new(history_limit),
        }
    }

    /// The current stage name.
    #[must_use]
    pub fn current_stage(&self) -> &str {
        &self.current_stage
    }

    /// The current payload.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Whether a transition is committing.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// The visited-stage log.
    #[must_use]
    pub fn history(&self) -> &StageHistory {
        &self.history
    }

    /// Makes `stage` current and appends it to the history.
    pub fn commit(&mut self, stage: impl Into<String>, data: Value) {
        self.current_stage = stage.into();
        self.data = data;
        self.history
            .record(HistoryEntry::new(self.current_stage.clone(), self.data.clone()));
    }

    /// Replaces the payload without touching stage or history.
    pub fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    /// Repositions on `stage` with a fresh one-entry history.
    pub fn reset_to(&mut self, stage: impl Into<String>, data: Value) {
        self.history.clear();
        self.commit(stage, data);
    }

    /// Captures stage, payload and history.
    #[must_use]
    pub fn checkpoint(&self) -> StoreCheckpoint {
        StoreCheckpoint {
            current_stage: self.current_stage.clone(),
            data: self.data.clone(),
            history: self.history.clone(),
        }
    }

    /// Restores content captured by [`StateStore::checkpoint`].
    pub fn restore(&mut self, checkpoint: StoreCheckpoint) {
        self.current_stage = checkpoint.current_stage;
        self.data = checkpoint.data;
        self.history = checkpoint.history;
    }

    pub(crate) fn set_transitioning(&mut self, value: bool) {
        self.transitioning = value;
    }
}

/// Holds the transitioning flag up for its lifetime.
///
/// The flag is cleared on drop, so every exit path of a pipeline run
/// (success, cancellation, error or a dropped future) releases it.
pub struct TransitioningGuard<'a> {
    store: &'a RwLock<StateStore>,
}

impl<'a> TransitioningGuard<'a> {
    /// Raises the flag on `store`.
    pub fn begin(store: &'a RwLock<StateStore>) -> Self {
        store.write().set_transitioning(true);
        Self { store }
    }
}

impl Drop for TransitioningGuard<'_> {
    fn drop(&mut self) {
        self.store.write().set_transitioning(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commit_appends_history() {
        let mut store = StateStore::new("idle", json!(null), None);
        store.commit("running", json!({"n": 1}));

        assert_eq!(store.current_stage(), "running");
        assert_eq!(store.data(), &json!({"n": 1}));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_set_data_keeps_stage_and_history() {
        let mut store = StateStore::new("idle", json!(null), None);
        store.set_data(json!(5));
        assert_eq!(store.current_stage(), "idle");
        assert_eq!(store.data(), &json!(5));
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut store = StateStore::new("a", json!(1), None);
        store.commit("a", json!(1));
        let checkpoint = store.checkpoint();

        store.commit("b", json!(2));
        store.restore(checkpoint);

        assert_eq!(store.current_stage(), "a");
        assert_eq!(store.data(), &json!(1));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_guard_clears_flag_on_drop() {
        let store = RwLock::new(StateStore::new("a", json!(null), None));
        {
            let _guard = TransitioningGuard::begin(&store);
            assert!(store.read().is_transitioning());
        }
        assert!(!store.read().is_transitioning());
    }

    #[test]
    fn test_reset_to_reseeds_history() {
        let mut store = StateStore::new("a", json!(null), None);
        store.commit("b", json!(null));
        store.commit("c", json!(null));
        store.reset_to("a", json!(0));

        assert_eq!(store.current_stage(), "a");
        assert_eq!(store.history().len(), 1);
    }
}

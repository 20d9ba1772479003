//! Bounded, append-only log of visited stages.

use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// One visited stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The stage that became current.
    pub stage: String,
    /// The payload committed with it.
    pub data: Value,
    /// When it was committed.
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(stage: impl Into<String>, data: Value) -> Self {
        Self {
            stage: stage.into(),
            data,
            timestamp: now_utc(),
        }
    }
}

/// History of committed stages, oldest first.
///
/// When a limit is set the oldest entries are dropped once it is exceeded.
#[derive(Debug, Clone, Default)]
pub struct StageHistory {
    entries: VecDeque<HistoryEntry>,
    limit: Option<usize>,
}

impl StageHistory {
    /// Creates an empty history with an optional cap.
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Appends an entry, evicting from the front past the cap.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        if let Some(limit) = self.limit {
            while self.entries.len() > limit {
                self.entries.pop_front();
            }
        }
    }

    /// Returns all entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

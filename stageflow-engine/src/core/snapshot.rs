//! Serializable `{stage, data}` snapshots for persistence plugins.

use crate::errors::EngineError;
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A point-in-time copy of the current stage and payload.
///
/// Storage backends are free to key and store these however they like;
/// the engine only produces and accepts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// The current stage at capture time.
    pub stage: String,
    /// The payload at capture time.
    pub data: Value,
    /// When the snapshot was taken.
    pub saved_at: Timestamp,
    /// When the snapshot stops being valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl StageSnapshot {
    /// Creates a snapshot that never expires.
    #[must_use]
    pub fn new(stage: impl Into<String>, data: Value) -> Self {
        Self {
            stage: stage.into(),
            data,
            saved_at: now_utc(),
            expires_at: None,
        }
    }

    /// Sets the expiry relative to `saved_at`.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.saved_at.checked_add_signed(ttl));
        self
    }

    /// Whether the snapshot has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// Whether the snapshot has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_utc())
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(input: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_without_ttl_never_expires() {
        let snapshot = StageSnapshot::new("main", json!({"user": 1}));
        assert!(!snapshot.is_expired());
        assert!(snapshot.expires_at.is_none());
    }

    #[test]
    fn test_snapshot_expiry() {
        let snapshot = StageSnapshot::new("main", json!(null)).with_ttl(Duration::from_secs(60));
        let later = snapshot.saved_at + chrono::Duration::seconds(61);
        assert!(!snapshot.is_expired_at(snapshot.saved_at));
        assert!(snapshot.is_expired_at(later));
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = StageSnapshot::new("main", json!([1, 2]));
        let json = snapshot.to_json().unwrap();
        assert!(!json.contains("expires_at"));
        assert_eq!(StageSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_malformed_snapshot_is_rejected() {
        let err = StageSnapshot::from_json("{\"stage\": 1}").unwrap_err();
        assert_eq!(err.kind(), "serialization");
    }
}

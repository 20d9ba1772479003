//! Engine lifecycle events.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// An event emitted by the engine for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// The event type (e.g., "transition.committed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl EngineEvent {
    /// Creates an event with no payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// "engine.started"
    #[must_use]
    pub fn started(stage: &str) -> Self {
        Self::new("engine.started").add_data("stage", json!(stage))
    }

    /// "engine.stopped"
    #[must_use]
    pub fn stopped(stage: &str) -> Self {
        Self::new("engine.stopped").add_data("stage", json!(stage))
    }

    /// "transition.started"
    #[must_use]
    pub fn transition_started(from: &str, to: &str, event: Option<&str>) -> Self {
        Self::new("transition.started")
            .add_data("from", json!(from))
            .add_data("to", json!(to))
            .add_data("event", json!(event))
    }

    /// "transition.committed"
    #[must_use]
    pub fn transition_committed(from: &str, to: &str, duration_ms: f64) -> Self {
        Self::new("transition.committed")
            .add_data("from", json!(from))
            .add_data("to", json!(to))
            .add_data("duration_ms", json!(duration_ms))
    }

    /// "transition.cancelled"
    #[must_use]
    pub fn transition_cancelled(from: &str, to: &str, reason: &str) -> Self {
        Self::new("transition.cancelled")
            .add_data("from", json!(from))
            .add_data("to", json!(to))
            .add_data("reason", json!(reason))
    }

    /// "transition.failed"
    #[must_use]
    pub fn transition_failed(from: &str, to: &str, kind: &str, error: &str) -> Self {
        Self::new("transition.failed")
            .add_data("from", json!(from))
            .add_data("to", json!(to))
            .add_data("kind", json!(kind))
            .add_data("error", json!(error))
    }

    /// "timer.scheduled"
    #[must_use]
    pub fn timer_scheduled(id: &str, stage: &str, target: &str, delay_ms: u64) -> Self {
        Self::new("timer.scheduled")
            .add_data("timer_id", json!(id))
            .add_data("stage", json!(stage))
            .add_data("target", json!(target))
            .add_data("delay_ms", json!(delay_ms))
    }

    /// "timer.fired"
    #[must_use]
    pub fn timer_fired(id: &str, stage: &str, target: &str) -> Self {
        Self::new("timer.fired")
            .add_data("timer_id", json!(id))
            .add_data("stage", json!(stage))
            .add_data("target", json!(target))
    }

    /// "timer.cancelled"
    #[must_use]
    pub fn timer_cancelled(id: &str, stage: &str) -> Self {
        Self::new("timer.cancelled")
            .add_data("timer_id", json!(id))
            .add_data("stage", json!(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_started_event() {
        let event = EngineEvent::transition_started("idle", "busy", Some("GO"));
        assert_eq!(event.event_type, "transition.started");
        assert_eq!(event.get("event"), Some(&json!("GO")));
    }

    #[test]
    fn test_direct_transition_has_null_event() {
        let event = EngineEvent::transition_started("idle", "busy", None);
        assert_eq!(event.get("event"), Some(&Value::Null));
    }

    #[test]
    fn test_event_serialization() {
        let event = EngineEvent::timer_fired("t1", "loading", "main");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "timer.fired");
        assert_eq!(json["data"]["target"], "main");

        let back: EngineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

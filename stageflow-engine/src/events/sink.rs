//! Event sink trait and implementations.

use super::EngineEvent;
use tracing::{debug, info, Level};

/// Destination for engine lifecycle events.
///
/// Emission happens inline on the engine's path, so implementations must
/// not block and must never panic; failures are theirs to log.
pub trait EventSink: Send + Sync {
    /// Receives one event.
    fn emit(&self, event: &EngineEvent);
}

/// A sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &EngineEvent) {}
}

/// A sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at `level` (only DEBUG and INFO are distinguished).
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &EngineEvent) {
        if self.level == Level::DEBUG {
            debug!(event_type = %event.event_type, event_data = ?event.data, "Engine event");
        } else {
            info!(event_type = %event.event_type, event_data = ?event.data, "Engine event");
        }
    }
}

/// A sink that keeps every event in memory. Intended for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<EngineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.read().clone()
    }

    /// Returns collected event types, in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<EngineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &EngineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_and_logging_sinks_accept_events() {
        let event = EngineEvent::started("idle");
        NoOpEventSink.emit(&event);
        LoggingEventSink::default().emit(&event);
        LoggingEventSink::debug().emit(&event);
    }

    #[test]
    fn test_collecting_sink_filter() {
        let sink = CollectingEventSink::new();
        sink.emit(&EngineEvent::transition_started("a", "b", None));
        sink.emit(&EngineEvent::transition_committed("a", "b", 1.0));
        sink.emit(&EngineEvent::timer_fired("t", "a", "b"));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type("transition.").len(), 2);
        assert_eq!(
            sink.event_types(),
            vec!["transition.started", "transition.committed", "timer.fired"]
        );

        sink.clear();
        assert!(sink.is_empty());
    }
}

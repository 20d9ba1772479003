//! Engine events for observability.
//!
//! Each engine owns one sink, configured on its `FlowConfig`. There is no
//! process-wide sink.

mod event;
mod sink;

pub use event::EngineEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

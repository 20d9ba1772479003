//! Logging setup and timing helpers.

mod tracing;

pub use self::tracing::{init_tracing, LogFormat, SpanTimer, TracingConfig};

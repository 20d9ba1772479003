//! Middleware (transition interceptors).
//!
//! Transition-scoped middleware declared on the matched transition runs
//! before globally registered middleware, each list in declaration order.

mod chain;
mod logging;

pub use chain::{run_chain, FnMiddleware, Middleware, MiddlewareFlow, MiddlewarePipeline, PipelineOutcome};
pub use logging::LoggingMiddleware;

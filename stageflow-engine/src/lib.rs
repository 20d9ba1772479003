//! # Stageflow Engine
//!
//! A declarative stage/state transition engine.
//!
//! A flow is a set of named stages with ordered, event-driven or delayed
//! transitions. The engine provides:
//!
//! - **Declarative flows**: stages, events, conditions and delays validated up front
//! - **Middleware**: transition-scoped and global interceptors that may cancel or rewrite
//! - **Plugins**: dependency-ordered extensions with lifecycle hooks
//! - **Timers**: delayed auto-transitions with pause, resume and versioned persistence
//! - **Event-driven observability**: per-engine event sinks and `tracing` logs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stageflow_engine::prelude::*;
//!
//! let config = FlowBuilder::new("loading")
//!     .stage(
//!         StageDefinition::new("loading")
//!             .transition(TransitionDefinition::to("main").after_ms(3000))
//!             .transition(TransitionDefinition::to("error").on("FAIL")),
//!     )
//!     .stage(StageDefinition::new("main"))
//!     .stage(StageDefinition::new("error"))
//!     .build()?;
//!
//! let engine = StageFlowEngine::new(config)?;
//! engine.start().await?;
//! engine.send("FAIL", None).await?;
//! assert_eq!(engine.current_stage(), "error");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod conditions;
pub mod config;
pub mod core;
pub mod engine;
pub mod errors;
pub mod events;
pub mod middleware;
pub mod observability;
pub mod plugins;
pub mod testing;
pub mod timers;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::conditions::{AsyncFnCondition, Condition, ConditionContext, FnCondition};
    pub use crate::config::{
        BusyPolicy, EngineOptions, FlowBuilder, FlowConfig, StageDefinition, StartPolicy,
        TransitionDefinition,
    };
    pub use crate::core::{
        HistoryEntry, Modification, StageSnapshot, TransitionContext, TransitionTrigger,
    };
    pub use crate::engine::{StageFlowEngine, Subscription, TransitionOutcome};
    pub use crate::errors::{
        ConfigurationError, EngineError, EngineResult, MiddlewareError, PluginError, TimerError,
        TransitionError,
    };
    pub use crate::events::{EngineEvent, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::middleware::{FnMiddleware, LoggingMiddleware, Middleware, MiddlewareFlow};
    pub use crate::plugins::Plugin;
    pub use crate::timers::TimerRecord;
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}

//! Declarative flow configuration.
//!
//! A flow is an initial stage name plus a list of stage definitions, each
//! with ordered transitions. Configurations are validated once, when the
//! engine is built; a malformed graph is a configuration error, never a
//! runtime one.

mod builder;
mod definition;
mod options;

pub use builder::{FlowBuilder, FlowConfig, StageGraph};
pub use definition::{StageDefinition, TransitionDefinition};
pub use options::{BusyPolicy, EngineOptions, StartPolicy};

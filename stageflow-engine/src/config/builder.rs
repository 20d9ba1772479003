//! Flow configuration and its validating builder.

use super::{EngineOptions, StageDefinition};
use crate::errors::ConfigurationError;
use crate::events::{EventSink, NoOpEventSink};
use crate::middleware::Middleware;
use crate::plugins::Plugin;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The complete declarative input of an engine.
#[derive(Clone)]
pub struct FlowConfig {
    /// Name of the stage the engine starts in.
    pub initial: String,
    /// Declared stages.
    pub stages: Vec<StageDefinition>,
    /// Global middleware, in execution order.
    pub middleware: Vec<Arc<dyn Middleware>>,
    /// Plugins installed by `start()`, in order.
    pub plugins: Vec<Arc<dyn Plugin>>,
    /// Behaviour options.
    pub options: EngineOptions,
    /// Destination for engine lifecycle events.
    pub event_sink: Arc<dyn EventSink>,
}

impl FlowConfig {
    /// Creates a configuration with defaults for everything but the graph.
    #[must_use]
    pub fn new(initial: impl Into<String>, stages: Vec<StageDefinition>) -> Self {
        Self {
            initial: initial.into(),
            stages,
            middleware: Vec::new(),
            plugins: Vec::new(),
            options: EngineOptions::default(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Validates the configuration and indexes its stages.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: no stages, an empty or duplicate
    /// stage name, an unknown initial stage, a transition that cannot fire,
    /// a transition to an undeclared stage, or duplicate middleware names.
    pub fn validate(&self) -> Result<StageGraph, ConfigurationError> {
        if self.stages.is_empty() {
            return Err(ConfigurationError::NoStages);
        }

        let mut index = HashMap::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter().enumerate() {
            stage.validate()?;
            if index.insert(stage.name.clone(), i).is_some() {
                return Err(ConfigurationError::DuplicateStage(stage.name.clone()));
            }
        }

        if !index.contains_key(&self.initial) {
            return Err(ConfigurationError::UnknownInitialStage(self.initial.clone()));
        }

        for stage in &self.stages {
            for transition in &stage.transitions {
                if !index.contains_key(&transition.target) {
                    return Err(ConfigurationError::UnknownTransitionTarget {
                        stage: stage.name.clone(),
                        target: transition.target.clone(),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for middleware in &self.middleware {
            if !seen.insert(middleware.name().to_string()) {
                return Err(ConfigurationError::DuplicateMiddleware(
                    middleware.name().to_string(),
                ));
            }
        }

        Ok(StageGraph {
            initial: self.initial.clone(),
            stages: self.stages.clone(),
            index,
        })
    }
}

impl std::fmt::Debug for FlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowConfig")
            .field("initial", &self.initial)
            .field("stages", &self.stages)
            .field("middleware", &self.middleware.len())
            .field("plugins", &self.plugins.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A validated, immutable stage graph.
#[derive(Debug, Clone)]
pub struct StageGraph {
    initial: String,
    stages: Vec<StageDefinition>,
    index: HashMap<String, usize>,
}

impl StageGraph {
    /// The initial stage name.
    #[must_use]
    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StageDefinition> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// Whether `name` is a declared stage.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Stage names in declaration order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of declared stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for flow configurations.
///
/// Transitions may reference stages declared later, so the graph is only
/// checked by [`FlowBuilder::build`].
#[derive(Clone)]
pub struct FlowBuilder {
    config: FlowConfig,
}

impl FlowBuilder {
    /// Starts a flow whose initial stage is `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            config: FlowConfig::new(initial, Vec::new()),
        }
    }

    /// Adds a stage.
    #[must_use]
    pub fn stage(mut self, stage: StageDefinition) -> Self {
        self.config.stages.push(stage);
        self
    }

    /// Adds a global middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.config.middleware.push(middleware);
        self
    }

    /// Adds a plugin to install on start.
    #[must_use]
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.config.plugins.push(plugin);
        self
    }

    /// Sets the engine options.
    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.config.event_sink = sink;
        self
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.config.stages.len()
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// See [`FlowConfig::validate`].
    pub fn build(self) -> Result<FlowConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransitionDefinition;
    use crate::middleware::LoggingMiddleware;

    fn two_stage_builder() -> FlowBuilder {
        FlowBuilder::new("idle")
            .stage(StageDefinition::new("idle").transition(TransitionDefinition::to("busy").on("GO")))
            .stage(StageDefinition::new("busy").transition(TransitionDefinition::to("idle").on("DONE")))
    }

    #[test]
    fn test_builder_valid_flow() {
        let config = two_stage_builder().build().unwrap();
        let graph = config.validate().unwrap();
        assert_eq!(graph.initial(), "idle");
        assert_eq!(graph.stage_names(), vec!["idle", "busy"]);
        assert!(graph.contains("busy"));
        assert!(graph.get("missing").is_none());
    }

    #[test]
    fn test_empty_flow_rejected() {
        let err = FlowBuilder::new("idle").build().unwrap_err();
        assert_eq!(err, ConfigurationError::NoStages);
    }

    #[test]
    fn test_unknown_initial_rejected() {
        let err = FlowBuilder::new("nowhere")
            .stage(StageDefinition::new("idle"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownInitialStage("nowhere".to_string()));
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = FlowBuilder::new("idle")
            .stage(StageDefinition::new("idle"))
            .stage(StageDefinition::new("idle"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateStage("idle".to_string()));
    }

    #[test]
    fn test_undeclared_target_rejected() {
        let err = FlowBuilder::new("idle")
            .stage(StageDefinition::new("idle").transition(TransitionDefinition::to("ghost").on("GO")))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownTransitionTarget {
                stage: "idle".to_string(),
                target: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_middleware_rejected() {
        let err = two_stage_builder()
            .middleware(Arc::new(LoggingMiddleware::new()))
            .middleware(Arc::new(LoggingMiddleware::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateMiddleware(_)));
    }
}

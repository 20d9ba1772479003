//! Error types for the stage flow engine.
//!
//! Every failure the engine can surface is one of four kinds: configuration,
//! transition, middleware or plugin errors. Timer errors cover scheduling and
//! timer-state restoration. All of them are wrapped by [`EngineError`], which
//! is what engine methods return.

use thiserror::Error;

/// The main error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The stage graph was rejected at construction time.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A transition could not be resolved or committed.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// A middleware failed or misused the transition context.
    #[error("{0}")]
    Middleware(#[from] MiddlewareError),

    /// A plugin failed to install, uninstall or run a hook.
    #[error("{0}")]
    Plugin(#[from] PluginError),

    /// A timer operation failed.
    #[error("{0}")]
    Timer(#[from] TimerError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    /// Returns a short machine-readable kind for logs and events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transition(_) => "transition",
            Self::Middleware(_) => "middleware",
            Self::Plugin(_) => "plugin",
            Self::Timer(_) => "timer",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Error raised when a flow configuration is malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The configuration declares no stages.
    #[error("Flow has no stages")]
    NoStages,

    /// The initial stage is not declared.
    #[error("Initial stage '{0}' is not declared")]
    UnknownInitialStage(String),

    /// Two stages share a name.
    #[error("Duplicate stage name '{0}'")]
    DuplicateStage(String),

    /// A stage name is empty.
    #[error("Stage names must not be empty")]
    EmptyStageName,

    /// A transition points at a stage that does not exist.
    #[error("Stage '{stage}' has a transition to undeclared stage '{target}'")]
    UnknownTransitionTarget {
        /// The stage declaring the transition.
        stage: String,
        /// The undeclared target.
        target: String,
    },

    /// Two global middleware share a name.
    #[error("Duplicate middleware name '{0}'")]
    DuplicateMiddleware(String),

    /// Engine options could not be parsed.
    #[error("Invalid engine options: {0}")]
    InvalidOptions(String),
}

/// Errors raised while resolving or committing a transition.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The engine has not been started, or was stopped.
    #[error("Engine is not active")]
    NotActive,

    /// `start()` was called on a running engine with the reject policy.
    #[error("Engine is already started")]
    AlreadyStarted,

    /// Another transition is in flight and the busy policy rejects.
    #[error("A transition is already in progress")]
    Busy,

    /// A direct navigation named a stage that is not configured.
    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    /// A condition raised an error while being evaluated.
    #[error("Condition on transition '{from}' -> '{to}' failed: {source}")]
    ConditionFailed {
        /// The current stage.
        from: String,
        /// The transition target.
        to: String,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised by the middleware pipeline.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// A middleware returned an error.
    #[error("Middleware '{name}' failed: {source}")]
    Failed {
        /// The middleware name.
        name: String,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// A middleware called both `cancel` and `modify` in one invocation.
    #[error("Middleware '{name}' violated cancel/modify exclusivity: {detail}")]
    ExclusivityViolation {
        /// The middleware name.
        name: String,
        /// Which call was rejected.
        detail: String,
    },

    /// A middleware rewrote the target to a stage that does not exist.
    #[error("Middleware '{name}' redirected to unknown stage '{target}'")]
    UnknownTarget {
        /// The middleware name.
        name: String,
        /// The undeclared target.
        target: String,
    },

    /// A middleware with the same name is already registered.
    #[error("Middleware '{0}' is already registered")]
    Duplicate(String),

    /// No middleware with this name is registered.
    #[error("Middleware '{0}' is not registered")]
    NotFound(String),
}

/// Lifecycle hook identifiers used in plugin errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginHook {
    /// The install hook.
    Install,
    /// The uninstall hook.
    Uninstall,
    /// Fired before the middleware pipeline.
    BeforeTransition,
    /// Fired after a committed transition.
    AfterTransition,
    /// Fired when a stage becomes current.
    StageEnter,
    /// Fired when a stage stops being current.
    StageExit,
}

impl std::fmt::Display for PluginHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::BeforeTransition => "before_transition",
            Self::AfterTransition => "after_transition",
            Self::StageEnter => "on_stage_enter",
            Self::StageExit => "on_stage_exit",
        };
        f.write_str(name)
    }
}

/// Errors raised by the plugin manager.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin with the same name is already installed.
    #[error("Plugin '{0}' is already installed")]
    AlreadyInstalled(String),

    /// A declared dependency is not installed.
    #[error("Plugin '{plugin}' depends on '{dependency}', which is not installed")]
    MissingDependency {
        /// The plugin being installed.
        plugin: String,
        /// The missing dependency.
        dependency: String,
    },

    /// No plugin with this name is installed.
    #[error("Plugin '{0}' is not installed")]
    NotInstalled(String),

    /// Other installed plugins still depend on this one.
    #[error("Plugin '{plugin}' is required by {}", dependents.join(", "))]
    HasDependents {
        /// The plugin being uninstalled.
        plugin: String,
        /// Installed plugins depending on it.
        dependents: Vec<String>,
    },

    /// A plugin hook returned an error.
    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    HookFailed {
        /// The plugin name.
        plugin: String,
        /// The failing hook.
        hook: PluginHook,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised by the timer manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimerError {
    /// No timer with this id exists.
    #[error("Timer '{0}' not found")]
    NotFound(String),

    /// Serialized timer state could not be decoded.
    #[error("Malformed timer state: {0}")]
    MalformedState(String),

    /// Serialized timer state uses an unsupported format version.
    #[error("Unsupported timer state version {found} (expected {expected})")]
    UnsupportedVersion {
        /// The version found in the input.
        found: u32,
        /// The version this build writes.
        expected: u32,
    },

    /// A restored timer references a stage that cannot own or receive it.
    #[error("Timer '{timer}' references invalid stage '{stage}'")]
    InvalidStage {
        /// The timer id.
        timer: String,
        /// The offending stage.
        stage: String,
    },
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::UnknownTransitionTarget {
            stage: "idle".to_string(),
            target: "nowhere".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Stage 'idle' has a transition to undeclared stage 'nowhere'"
        );
    }

    #[test]
    fn test_engine_error_kind() {
        let err: EngineError = TransitionError::Busy.into();
        assert_eq!(err.kind(), "transition");

        let err: EngineError = PluginError::NotInstalled("a".to_string()).into();
        assert_eq!(err.kind(), "plugin");
    }

    #[test]
    fn test_has_dependents_lists_plugins() {
        let err = PluginError::HasDependents {
            plugin: "a".to_string(),
            dependents: vec!["b".to_string(), "c".to_string()],
        };
        assert_eq!(err.to_string(), "Plugin 'a' is required by b, c");
    }

    #[test]
    fn test_hook_failed_display() {
        let err = PluginError::HookFailed {
            plugin: "analytics".to_string(),
            hook: PluginHook::StageEnter,
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.to_string(), "Plugin 'analytics' failed in on_stage_enter: boom");
    }
}

//! Engine behaviour options.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};

/// What happens to a mutation issued while another one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Wait for the in-flight transition, then run in arrival order.
    #[default]
    Queue,
    /// Fail immediately with `TransitionError::Busy`.
    Reject,
}

/// What `start()` does on an engine that is already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Return `Ok` without doing anything.
    #[default]
    Ignore,
    /// Fail with `TransitionError::AlreadyStarted`.
    Reject,
}

/// Tunable engine behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Maximum retained history entries; `None` keeps everything.
    #[serde(default)]
    pub history_limit: Option<usize>,
    /// Policy for concurrent mutations.
    #[serde(default)]
    pub busy_policy: BusyPolicy,
    /// Policy for repeated `start()` calls.
    #[serde(default)]
    pub start_policy: StartPolicy,
    /// Whether timers of the initial stage are armed by `start()`.
    #[serde(default = "default_arm_initial_timers")]
    pub arm_initial_timers: bool,
}

fn default_arm_initial_timers() -> bool {
    true
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            history_limit: None,
            busy_policy: BusyPolicy::default(),
            start_policy: StartPolicy::default(),
            arm_initial_timers: default_arm_initial_timers(),
        }
    }
}

impl EngineOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidOptions` for malformed input.
    pub fn from_json(input: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(input).map_err(|e| ConfigurationError::InvalidOptions(e.to_string()))
    }

    /// Caps the history.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Sets the busy policy.
    #[must_use]
    pub fn with_busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.busy_policy = policy;
        self
    }

    /// Sets the start policy.
    #[must_use]
    pub fn with_start_policy(mut self, policy: StartPolicy) -> Self {
        self.start_policy = policy;
        self
    }

    /// Controls whether `start()` arms the initial stage's timers.
    #[must_use]
    pub fn with_arm_initial_timers(mut self, arm: bool) -> Self {
        self.arm_initial_timers = arm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.history_limit, None);
        assert_eq!(options.busy_policy, BusyPolicy::Queue);
        assert_eq!(options.start_policy, StartPolicy::Ignore);
        assert!(options.arm_initial_timers);
    }

    #[test]
    fn test_from_json_partial() {
        let options = EngineOptions::from_json(r#"{"busy_policy": "reject", "history_limit": 10}"#).unwrap();
        assert_eq!(options.busy_policy, BusyPolicy::Reject);
        assert_eq!(options.history_limit, Some(10));
        assert_eq!(options.start_policy, StartPolicy::Ignore);
        assert!(options.arm_initial_timers);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = EngineOptions::from_json(r#"{"busy_policy": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidOptions(_)));
    }

    #[test]
    fn test_builder_setters() {
        let options = EngineOptions::new()
            .with_history_limit(3)
            .with_start_policy(StartPolicy::Reject)
            .with_arm_initial_timers(false);
        assert_eq!(options.history_limit, Some(3));
        assert_eq!(options.start_policy, StartPolicy::Reject);
        assert!(!options.arm_initial_timers);
    }
}

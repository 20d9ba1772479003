//! Stage and transition definitions.

use crate::conditions::{Condition, ConditionContext, FnCondition};
use crate::errors::ConfigurationError;
use crate::middleware::Middleware;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// A rule moving the owning stage to `target`.
///
/// A transition can be event-triggered, condition-gated, timer-triggered or
/// any combination. One with neither an event nor a delay is automatic: it
/// is taken as soon as its condition holds in the owning stage.
#[derive(Clone)]
pub struct TransitionDefinition {
    /// The stage to move to.
    pub target: String,
    /// Event name that triggers this transition.
    pub event: Option<String>,
    /// Gate evaluated before the transition is taken.
    pub condition: Option<Arc<dyn Condition>>,
    /// Delay after stage entry at which the transition fires on its own.
    pub delay: Option<Duration>,
    /// Middleware run for this transition only, before global middleware.
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl TransitionDefinition {
    /// Creates a transition to `target` with no trigger yet.
    #[must_use]
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            event: None,
            condition: None,
            delay: None,
            middleware: Vec::new(),
        }
    }

    /// Sets the triggering event.
    #[must_use]
    pub fn on(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Fires the transition after `delay` in the owning stage.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fires the transition after `ms` milliseconds in the owning stage.
    #[must_use]
    pub fn after_ms(self, ms: u64) -> Self {
        self.after(Duration::from_millis(ms))
    }

    /// Gates the transition with a synchronous predicate.
    #[must_use]
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&ConditionContext) -> bool + Send + Sync + 'static,
    {
        self.with_condition(Arc::new(FnCondition::new(predicate)))
    }

    /// Gates the transition with any condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Appends a transition-scoped middleware.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Whether `event` triggers this transition.
    #[must_use]
    pub fn matches_event(&self, event: &str) -> bool {
        self.event.as_deref() == Some(event)
    }

    /// Whether the transition fires without an event or a timer.
    #[must_use]
    pub fn is_automatic(&self) -> bool {
        self.event.is_none() && self.delay.is_none()
    }
}

impl std::fmt::Debug for TransitionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionDefinition")
            .field("target", &self.target)
            .field("event", &self.event)
            .field("conditional", &self.condition.is_some())
            .field("delay", &self.delay)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A named stage in the flow.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    /// The unique stage name.
    pub name: String,
    /// Payload committed when the stage is entered without explicit data.
    pub data: Option<Value>,
    /// Outgoing transitions, in declaration order.
    pub transitions: Vec<TransitionDefinition>,
    /// Opaque presentation effect reference, uninterpreted by the engine.
    pub effect: Option<Value>,
}

impl StageDefinition {
    /// Creates a stage with no transitions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
            transitions: Vec::new(),
            effect: None,
        }
    }

    /// Sets the initial payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the effect reference.
    #[must_use]
    pub fn with_effect(mut self, effect: Value) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Appends a transition.
    #[must_use]
    pub fn transition(mut self, transition: TransitionDefinition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Iterates the transitions carrying a delay, with their index.
    pub fn delayed_transitions(&self) -> impl Iterator<Item = (usize, &TransitionDefinition)> {
        self.transitions
            .iter()
            .enumerate()
            .filter(|(_, t)| t.delay.is_some())
    }

    /// Iterates the automatic transitions, in declaration order.
    pub fn automatic_transitions(&self) -> impl Iterator<Item = &TransitionDefinition> {
        self.transitions.iter().filter(|t| t.is_automatic())
    }

    /// Event names accepted by this stage, deduplicated, in declaration order.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.transitions
            .iter()
            .filter_map(|t| t.event.clone())
            .filter(|e| seen.insert(e.clone()))
            .collect()
    }

    /// Validates the stage in isolation.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyStageName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transition_builder() {
        let t = TransitionDefinition::to("main").on("NEXT").after_ms(3000);
        assert_eq!(t.target, "main");
        assert!(t.matches_event("NEXT"));
        assert!(!t.matches_event("BACK"));
        assert_eq!(t.delay, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_stage_events_are_deduplicated() {
        let stage = StageDefinition::new("form")
            .transition(TransitionDefinition::to("a").on("SUBMIT"))
            .transition(TransitionDefinition::to("b").on("SUBMIT"))
            .transition(TransitionDefinition::to("c").on("CANCEL"));

        assert_eq!(stage.events(), vec!["SUBMIT", "CANCEL"]);
    }

    #[test]
    fn test_delayed_transitions() {
        let stage = StageDefinition::new("loading")
            .with_data(json!({"progress": 0}))
            .transition(TransitionDefinition::to("error").on("FAIL"))
            .transition(TransitionDefinition::to("main").after_ms(3000));

        let delayed: Vec<_> = stage.delayed_transitions().map(|(i, t)| (i, t.target.clone())).collect();
        assert_eq!(delayed, vec![(1, "main".to_string())]);
    }

    #[test]
    fn test_condition_only_transition_is_automatic() {
        let stage = StageDefinition::new("validation")
            .transition(TransitionDefinition::to("success").when(|ctx| ctx.data["valid"] == true))
            .transition(TransitionDefinition::to("input").on("BACK"))
            .transition(TransitionDefinition::to("timeout").after_ms(500));

        assert_eq!(stage.validate(), Ok(()));
        let automatic: Vec<_> = stage.automatic_transitions().map(|t| t.target.clone()).collect();
        assert_eq!(automatic, vec!["success"]);
        assert_eq!(stage.events(), vec!["BACK"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            StageDefinition::new("  ").validate(),
            Err(ConfigurationError::EmptyStageName)
        );
    }
}

//! The per-attempt transition proposal passed through middleware.

use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What caused a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// An event sent with `send`.
    Event(String),
    /// A direct navigation request (`go_to`).
    Direct,
    /// A delayed transition whose timer elapsed.
    Timer(String),
}

impl TransitionTrigger {
    /// Returns the event name for event-triggered transitions.
    #[must_use]
    pub fn event(&self) -> Option<&str> {
        match self {
            Self::Event(name) => Some(name),
            _ => None,
        }
    }
}

/// A rewrite requested by a middleware.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modification {
    /// Replacement target stage.
    pub to: Option<String>,
    /// Replacement payload.
    pub data: Option<Value>,
}

impl Modification {
    /// Creates an empty modification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirects the transition to another stage.
    #[must_use]
    pub fn to(stage: impl Into<String>) -> Self {
        Self {
            to: Some(stage.into()),
            data: None,
        }
    }

    /// Replaces the payload.
    #[must_use]
    pub fn data(data: Value) -> Self {
        Self {
            to: None,
            data: Some(data),
        }
    }

    /// Sets the replacement payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the replacement target.
    #[must_use]
    pub fn with_target(mut self, stage: impl Into<String>) -> Self {
        self.to = Some(stage.into());
        self
    }
}

/// Action taken by the middleware currently being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InvocationAction {
    #[default]
    None,
    Cancelled,
    Modified,
}

/// Ephemeral proposal for one transition attempt.
///
/// Middleware may cancel the proposal or rewrite its target and payload.
/// Within a single middleware invocation `cancel` and `modify` are mutually
/// exclusive: the second call is refused and recorded as a violation, which
/// aborts the transition.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    from: String,
    to: String,
    data: Value,
    trigger: TransitionTrigger,
    timestamp: Timestamp,
    cancel_reason: Option<String>,
    action: InvocationAction,
    violation: Option<String>,
    redirected: bool,
}

impl TransitionContext {
    /// Creates a new proposal.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        trigger: TransitionTrigger,
        data: Value,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            data,
            trigger,
            timestamp: now_utc(),
            cancel_reason: None,
            action: InvocationAction::None,
            violation: None,
            redirected: false,
        }
    }

    /// The stage being left.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The proposed target stage.
    #[must_use]
    pub fn to(&self) -> &str {
        &self.to
    }

    /// The proposed payload.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The triggering event name, if the attempt came from `send`.
    #[must_use]
    pub fn event(&self) -> Option<&str> {
        self.trigger.event()
    }

    /// What caused this attempt.
    #[must_use]
    pub fn trigger(&self) -> &TransitionTrigger {
        &self.trigger
    }

    /// When the attempt was created.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether a middleware cancelled the attempt.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_reason.is_some()
    }

    /// The cancellation reason, if cancelled.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Cancels the attempt. Returns `false` if refused.
    ///
    /// Refused when the same middleware invocation already called `modify`.
    pub fn cancel(&mut self, reason: impl Into<String>) -> bool {
        if self.action == InvocationAction::Modified {
            self.violation = Some("cancel() called after modify()".to_string());
            return false;
        }
        if self.cancel_reason.is_none() {
            self.cancel_reason = Some(reason.into());
        }
        self.action = InvocationAction::Cancelled;
        true
    }

    /// Rewrites the target and/or payload. Returns `false` if refused.
    ///
    /// Refused when the attempt is already cancelled.
    pub fn modify(&mut self, modification: Modification) -> bool {
        if self.is_cancelled() {
            self.violation = Some("modify() called after cancel()".to_string());
            return false;
        }
        if let Some(to) = modification.to {
            if to != self.to {
                self.redirected = true;
            }
            self.to = to;
        }
        if let Some(data) = modification.data {
            self.data = data;
        }
        self.action = InvocationAction::Modified;
        true
    }

    pub(crate) fn begin_invocation(&mut self) {
        self.action = InvocationAction::None;
        self.redirected = false;
    }

    pub(crate) fn take_violation(&mut self) -> Option<String> {
        self.violation.take()
    }

    pub(crate) fn was_redirected(&self) -> bool {
        self.redirected
    }
}

//! Test assertions for engine state.

use crate::engine::{StageFlowEngine, TransitionOutcome};

/// Asserts that the engine is in `expected`.
pub fn assert_stage(engine: &StageFlowEngine, expected: &str) {
    let actual = engine.current_stage();
    assert_eq!(actual, expected, "Expected stage '{expected}', got '{actual}'");
}

/// Asserts that the outcome committed into `expected`.
pub fn assert_committed(outcome: &TransitionOutcome, expected: &str) {
    assert_eq!(
        outcome.committed_stage(),
        Some(expected),
        "Expected commit into '{expected}', got {outcome:?}"
    );
}

/// Asserts that the outcome was a cancellation.
pub fn assert_cancelled(outcome: &TransitionOutcome) {
    assert!(
        matches!(outcome, TransitionOutcome::Cancelled { .. }),
        "Expected cancellation, got {outcome:?}"
    );
}

/// Asserts the stages recorded in history, oldest first.
pub fn assert_history_stages(engine: &StageFlowEngine, expected: &[&str]) {
    let stages: Vec<String> = engine.history().into_iter().map(|e| e.stage).collect();
    assert_eq!(stages, expected, "Unexpected history");
}

//! Sample flows for tests and benchmarks.

use serde_json::json;

use crate::config::{FlowBuilder, StageDefinition, TransitionDefinition};

/// `loading` moves to `main` after three seconds, or to `error` on `FAIL`.
/// `error` returns to `loading` on `RETRY`.
#[must_use]
pub fn loading_flow() -> FlowBuilder {
    FlowBuilder::new("loading")
        .stage(
            StageDefinition::new("loading")
                .with_data(json!({"progress": 0}))
                .with_effect(json!({"type": "spinner"}))
                .transition(TransitionDefinition::to("main").after_ms(3000))
                .transition(TransitionDefinition::to("error").on("FAIL")),
        )
        .stage(StageDefinition::new("main").with_data(json!({"ready": true})))
        .stage(StageDefinition::new("error").transition(TransitionDefinition::to("loading").on("RETRY")))
}

/// A three-step form: `input` → `validation` → `success`, with
/// `INVALID` sending validation back to input.
#[must_use]
pub fn form_flow() -> FlowBuilder {
    FlowBuilder::new("input")
        .stage(
            StageDefinition::new("input")
                .with_data(json!({}))
                .transition(TransitionDefinition::to("validation").on("SUBMIT")),
        )
        .stage(
            StageDefinition::new("validation")
                .transition(TransitionDefinition::to("success").on("VALID"))
                .transition(TransitionDefinition::to("input").on("INVALID")),
        )
        .stage(StageDefinition::new("success"))
}

/// A flow of `count` stages `s0..s{count-1}`, each moving to the next on
/// `NEXT`, with the last one wrapping around to `s0`.
#[must_use]
pub fn ring_flow(count: usize) -> FlowBuilder {
    let count = count.max(1);
    (0..count).fold(FlowBuilder::new("s0"), |builder, i| {
        builder.stage(
            StageDefinition::new(format!("s{i}"))
                .transition(TransitionDefinition::to(format!("s{}", (i + 1) % count)).on("NEXT")),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid() {
        assert!(loading_flow().build().is_ok());
        assert!(form_flow().build().is_ok());
        assert_eq!(ring_flow(4).stage_count(), 4);
        assert!(ring_flow(4).build().is_ok());
    }
}

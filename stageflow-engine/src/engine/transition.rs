//! One transition attempt: hooks, middleware, commit and rollback.

use super::{StageFlowEngine, TransitionOutcome};
use crate::conditions::ConditionContext;
use crate::config::TransitionDefinition;
use crate::core::{TransitionContext, TransitionTrigger, TransitioningGuard};
use crate::errors::{EngineError, EngineResult, PluginError, TransitionError};
use crate::events::EngineEvent;
use crate::middleware::{run_chain, Middleware, PipelineOutcome};
use crate::observability::SpanTimer;
use crate::plugins::{Plugin, PluginManager};
use crate::timers::TimerFiring;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl StageFlowEngine {
    /// Evaluates a transition's condition. A transition without one is
    /// always allowed.
    pub(super) async fn condition_allows(
        &self,
        stage: &str,
        data: &Value,
        event: Option<&str>,
        transition: &TransitionDefinition,
    ) -> Result<bool, TransitionError> {
        let Some(condition) = &transition.condition else {
            return Ok(true);
        };
        let ctx = ConditionContext {
            stage: stage.to_string(),
            data: data.clone(),
            event: event.map(str::to_string),
            target: transition.target.clone(),
        };
        condition
            .evaluate(&ctx)
            .await
            .map_err(|source| TransitionError::ConditionFailed {
                from: stage.to_string(),
                to: transition.target.clone(),
                source,
            })
    }

    /// Runs one transition attempt. The caller holds the gate.
    pub(super) async fn run_transition(
        &self,
        target: &str,
        trigger: TransitionTrigger,
        data: Option<Value>,
        scoped: &[Arc<dyn Middleware>],
    ) -> EngineResult<TransitionOutcome> {
        let timer = SpanTimer::start("transition");
        let (from, from_data) = self.current_state();
        let data = data
            .or_else(|| self.inner.graph.get(target).and_then(|s| s.data.clone()))
            .unwrap_or(Value::Null);

        let mut ctx = TransitionContext::new(&from, target, trigger, data);
        let _transitioning = TransitioningGuard::begin(&self.inner.store);
        self.emit(&EngineEvent::transition_started(&from, target, ctx.event()));

        let result = self.drive(&mut ctx, &from_data, scoped).await;

        match &result {
            Ok(TransitionOutcome::Committed { from, to }) => {
                let duration_ms = timer.finish();
                self.emit(&EngineEvent::transition_committed(from, to, duration_ms));
                info!(from = %from, to = %to, duration_ms, "Transition committed");
            }
            Ok(TransitionOutcome::Cancelled { reason }) => {
                self.emit(&EngineEvent::transition_cancelled(&from, ctx.to(), reason));
                info!(from = %from, to = %ctx.to(), reason = %reason, "Transition cancelled");
            }
            Ok(TransitionOutcome::Halted { middleware }) => {
                debug!(from = %from, to = %ctx.to(), middleware = %middleware, "Transition halted");
            }
            Ok(TransitionOutcome::NoMatch) => {}
            Err(err) => {
                self.emit(&EngineEvent::transition_failed(
                    &from,
                    ctx.to(),
                    err.kind(),
                    &err.to_string(),
                ));
                warn!(from = %from, to = %ctx.to(), error = %err, "Transition failed");
            }
        }

        result
    }

    async fn drive(
        &self,
        ctx: &mut TransitionContext,
        from_data: &Value,
        scoped: &[Arc<dyn Middleware>],
    ) -> EngineResult<TransitionOutcome> {
        let plugins = self.inner.plugins.read().snapshot();
        PluginManager::before_transition(&plugins, ctx).await?;

        let chain = self.inner.middleware.read().compose(scoped);
        match run_chain(&chain, ctx, &self.inner.graph).await? {
            PipelineOutcome::Proceed => {}
            PipelineOutcome::Cancelled { reason, .. } => {
                return Ok(TransitionOutcome::Cancelled { reason });
            }
            PipelineOutcome::Halted { middleware } => {
                return Ok(TransitionOutcome::Halted { middleware });
            }
        }

        let from = ctx.from().to_string();
        let to = ctx.to().to_string();
        let data = ctx.data().clone();

        PluginManager::stage_exit(&plugins, &from, from_data).await?;

        let checkpoint = self.inner.store.read().checkpoint();
        let suspended = self.inner.timers.lock().suspend_stage(&from);
        self.inner.store.write().commit(&to, data.clone());

        if let Err(err) = Self::enter_stage(&plugins, ctx, &to, &data).await {
            self.inner.store.write().restore(checkpoint);
            self.inner.timers.lock().reinstate(suspended);
            warn!(from = %from, to = %to, "Transition rolled back");
            return Err(EngineError::from(err));
        }

        self.emit_cancelled(&suspended);
        self.arm_stage_timers(&to);
        self.inner.subscribers.notify(&to, &data);

        Ok(TransitionOutcome::Committed { from, to })
    }

    async fn enter_stage(
        plugins: &[Arc<dyn Plugin>],
        ctx: &TransitionContext,
        stage: &str,
        data: &Value,
    ) -> Result<(), PluginError> {
        PluginManager::stage_enter(plugins, stage, data).await?;
        PluginManager::after_transition(plugins, ctx).await
    }

    /// Handles an elapsed timer.
    ///
    /// The firing is claimed under the gate; a stale or cancelled firing is
    /// dropped. The owning transition's condition is evaluated, and if it
    /// holds the transition runs through its scoped and global middleware.
    pub(super) async fn fire_timer(&self, firing: TimerFiring) {
        let _gate = self.inner.gate.lock().await;
        if !self.is_active() {
            return;
        }

        let claimed = self.inner.timers.lock().claim(&firing);
        let Some(record) = claimed else {
            debug!(timer_id = %firing.id, "Stale timer wake-up ignored");
            return;
        };

        let (stage, data) = self.current_state();
        if record.stage != stage {
            debug!(timer_id = %record.id, owner = %record.stage, stage = %stage, "Timer no longer owned by current stage");
            return;
        }
        self.emit(&EngineEvent::timer_fired(&record.id, &record.stage, &record.target));
        debug!(timer_id = %record.id, stage = %record.stage, target = %record.target, "Timer fired");

        let Some(transition) = self
            .inner
            .graph
            .get(&record.stage)
            .and_then(|s| s.transitions.get(record.transition_index))
        else {
            warn!(timer_id = %record.id, "Timer points at no transition");
            return;
        };

        match self.condition_allows(&stage, &data, None, transition).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(timer_id = %record.id, "Condition rejected timed transition");
                return;
            }
            Err(err) => {
                warn!(timer_id = %record.id, error = %err, "Timer condition failed");
                return;
            }
        }

        match self
            .run_transition(
                &transition.target,
                TransitionTrigger::Timer(record.id.clone()),
                None,
                &transition.middleware,
            )
            .await
        {
            Ok(outcome) if outcome.is_committed() => self.run_automatic().await,
            Ok(_) => {}
            Err(err) => warn!(timer_id = %record.id, error = %err, "Timed transition failed"),
        }
    }

    /// Takes automatic transitions out of the current stage until none
    /// applies. The caller holds the gate.
    ///
    /// Candidates are evaluated in declaration order and the first whose
    /// condition holds runs through the pipeline with trigger `Direct`.
    /// Chains stop after one step per declared stage.
    pub(super) async fn run_automatic(&self) {
        let limit = self.inner.graph.stage_count();
        for _ in 0..limit {
            if !self.is_active() {
                return;
            }
            let (stage, data) = self.current_state();
            let Some(definition) = self.inner.graph.get(&stage) else {
                return;
            };

            let mut chosen = None;
            for transition in definition.automatic_transitions() {
                match self.condition_allows(&stage, &data, None, transition).await {
                    Ok(true) => {
                        chosen = Some(transition);
                        break;
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(stage = %stage, error = %err, "Automatic transition condition failed");
                        return;
                    }
                }
            }
            let Some(transition) = chosen else {
                return;
            };

            debug!(stage = %stage, target = %transition.target, "Taking automatic transition");
            match self
                .run_transition(
                    &transition.target,
                    TransitionTrigger::Direct,
                    None,
                    &transition.middleware,
                )
                .await
            {
                Ok(outcome) if outcome.is_committed() => {}
                Ok(_) => return,
                Err(err) => {
                    warn!(stage = %stage, target = %transition.target, error = %err, "Automatic transition failed");
                    return;
                }
            }
        }
        warn!(stage = %self.current_stage(), limit, "Automatic transition chain stopped");
    }
}

//! Middleware trait and the ordered pipeline that runs it.

use crate::config::StageGraph;
use crate::core::TransitionContext;
use crate::errors::MiddlewareError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Whether the pipeline should continue after a middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareFlow {
    /// Proceed to the next middleware, or to commit after the last one.
    Continue,
    /// Stop here without committing.
    Halt,
}

/// Trait for transition interceptors.
///
/// A middleware observes the pending transition and may cancel it, rewrite
/// its target and payload, or halt the pipeline. Middleware runs strictly in
/// sequence, so later middleware sees earlier rewrites.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// The unique registration name.
    fn name(&self) -> &str;

    /// Handles one transition attempt.
    async fn handle(&self, ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow>;
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every middleware continued; the transition may commit.
    Proceed,
    /// A middleware cancelled the transition.
    Cancelled {
        /// The cancelling middleware.
        middleware: String,
        /// The reason it gave.
        reason: String,
    },
    /// A middleware halted the pipeline.
    Halted {
        /// The halting middleware.
        middleware: String,
    },
}

/// Ordered registry of global middleware.
///
/// Insertion order is execution order. Names are unique.
#[derive(Default, Clone)]
pub struct MiddlewarePipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware.
    ///
    /// # Errors
    ///
    /// Returns `MiddlewareError::Duplicate` if the name is taken.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) -> Result<(), MiddlewareError> {
        if self.contains(middleware.name()) {
            return Err(MiddlewareError::Duplicate(middleware.name().to_string()));
        }
        self.middleware.push(middleware);
        Ok(())
    }

    /// Removes a middleware by name.
    ///
    /// # Errors
    ///
    /// Returns `MiddlewareError::NotFound` if no such middleware exists.
    pub fn remove(&mut self, name: &str) -> Result<Arc<dyn Middleware>, MiddlewareError> {
        let position = self
            .middleware
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| MiddlewareError::NotFound(name.to_string()))?;
        Ok(self.middleware.remove(position))
    }

    /// Whether a middleware with `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.middleware.iter().any(|m| m.name() == name)
    }

    /// Registered names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.middleware.iter().map(|m| m.name().to_string()).collect()
    }

    /// Returns the chain for one transition: scoped first, then global.
    #[must_use]
    pub fn compose(&self, scoped: &[Arc<dyn Middleware>]) -> Vec<Arc<dyn Middleware>> {
        scoped.iter().chain(self.middleware.iter()).cloned().collect()
    }

    /// Returns the number of global middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns true if no global middleware is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

/// Runs `chain` over `ctx`, stopping at the first cancel, halt or error.
///
/// After every invocation the context is checked for a cancel/modify
/// exclusivity violation and for a redirect to an undeclared stage.
///
/// # Errors
///
/// Returns a `MiddlewareError` if a middleware fails, misuses the context,
/// or redirects to an unknown stage.
pub async fn run_chain(
    chain: &[Arc<dyn Middleware>],
    ctx: &mut TransitionContext,
    stages: &StageGraph,
) -> Result<PipelineOutcome, MiddlewareError> {
    for middleware in chain {
        let name = middleware.name();
        ctx.begin_invocation();

        let flow = middleware
            .handle(ctx)
            .await
            .map_err(|source| MiddlewareError::Failed {
                name: name.to_string(),
                source,
            })?;

        if let Some(detail) = ctx.take_violation() {
            return Err(MiddlewareError::ExclusivityViolation {
                name: name.to_string(),
                detail,
            });
        }

        if ctx.was_redirected() && !stages.contains(ctx.to()) {
            return Err(MiddlewareError::UnknownTarget {
                name: name.to_string(),
                target: ctx.to().to_string(),
            });
        }

        if let Some(reason) = ctx.cancel_reason() {
            debug!(middleware = name, reason, "Transition cancelled by middleware");
            return Ok(PipelineOutcome::Cancelled {
                middleware: name.to_string(),
                reason: reason.to_string(),
            });
        }

        if flow == MiddlewareFlow::Halt {
            debug!(middleware = name, "Transition halted by middleware");
            return Ok(PipelineOutcome::Halted {
                middleware: name.to_string(),
            });
        }
    }
    Ok(PipelineOutcome::Proceed)
}

/// A middleware backed by a synchronous closure.
pub struct FnMiddleware<F>
where
    F: Fn(&mut TransitionContext) -> anyhow::Result<MiddlewareFlow> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(&mut TransitionContext) -> anyhow::Result<MiddlewareFlow> + Send + Sync,
{
    /// Creates a new closure middleware.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut TransitionContext) -> anyhow::Result<MiddlewareFlow> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow> {
        (self.func)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlowBuilder, StageDefinition, TransitionDefinition};
    use crate::core::{Modification, TransitionTrigger};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    fn graph() -> StageGraph {
        FlowBuilder::new("input")
            .stage(StageDefinition::new("input").transition(TransitionDefinition::to("validation").on("SUBMIT")))
            .stage(StageDefinition::new("validation"))
            .stage(StageDefinition::new("error"))
            .build()
            .unwrap()
            .validate()
            .unwrap()
    }

    fn ctx() -> TransitionContext {
        TransitionContext::new(
            "input",
            "validation",
            TransitionTrigger::Event("SUBMIT".to_string()),
            Value::Null,
        )
    }

    fn recorder(name: &str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn Middleware> {
        let label = name.to_string();
        Arc::new(FnMiddleware::new(name, move |_ctx: &mut TransitionContext| {
            log.lock().push(label.clone());
            Ok(MiddlewareFlow::Continue)
        }))
    }

    #[test]
    fn test_add_and_remove() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.add(recorder("a", log.clone())).unwrap();
        pipeline.add(recorder("b", log.clone())).unwrap();

        assert!(matches!(
            pipeline.add(recorder("a", log)),
            Err(MiddlewareError::Duplicate(_))
        ));
        assert_eq!(pipeline.names(), vec!["a", "b"]);

        pipeline.remove("a").unwrap();
        assert_eq!(pipeline.names(), vec!["b"]);
        assert!(matches!(pipeline.remove("a"), Err(MiddlewareError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_scoped_runs_before_global() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.add(recorder("logM", log.clone())).unwrap();

        let chain = pipeline.compose(&[recorder("validateM", log.clone())]);
        let outcome = run_chain(&chain, &mut ctx(), &graph()).await.unwrap();

        assert_eq!(outcome, PipelineOutcome::Proceed);
        assert_eq!(*log.lock(), vec!["validateM", "logM"]);
    }

    #[tokio::test]
    async fn test_cancel_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let cancel: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("guard", |ctx: &mut TransitionContext| {
            ctx.cancel("not allowed");
            Ok(MiddlewareFlow::Continue)
        }));
        let chain = vec![cancel, recorder("after", log.clone())];

        let outcome = run_chain(&chain, &mut ctx(), &graph()).await.unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::Cancelled {
                middleware: "guard".to_string(),
                reason: "not allowed".to_string(),
            }
        );
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_halt_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let halt: Arc<dyn Middleware> =
            Arc::new(FnMiddleware::new("halt", |_ctx: &mut TransitionContext| Ok(MiddlewareFlow::Halt)));
        let chain = vec![halt, recorder("after", log.clone())];

        let outcome = run_chain(&chain, &mut ctx(), &graph()).await.unwrap();
        assert!(matches!(outcome, PipelineOutcome::Halted { .. }));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_later_middleware_sees_rewrite() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let rewrite: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("rewrite", |ctx: &mut TransitionContext| {
            ctx.modify(Modification::to("error").with_data(json!({"code": 1})));
            Ok(MiddlewareFlow::Continue)
        }));
        let observe: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("observe", move |ctx: &mut TransitionContext| {
            *seen_clone.lock() = Some(ctx.to().to_string());
            Ok(MiddlewareFlow::Continue)
        }));

        let mut ctx = ctx();
        run_chain(&[rewrite, observe], &mut ctx, &graph()).await.unwrap();

        assert_eq!(seen.lock().as_deref(), Some("error"));
        assert_eq!(ctx.data(), &json!({"code": 1}));
    }

    #[tokio::test]
    async fn test_redirect_to_unknown_stage_fails() {
        let rewrite: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("rewrite", |ctx: &mut TransitionContext| {
            ctx.modify(Modification::to("ghost"));
            Ok(MiddlewareFlow::Continue)
        }));

        let err = run_chain(&[rewrite], &mut ctx(), &graph()).await.unwrap_err();
        assert!(matches!(err, MiddlewareError::UnknownTarget { target, .. } if target == "ghost"));
    }

    #[tokio::test]
    async fn test_exclusivity_violation_fails() {
        let both: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("both", |ctx: &mut TransitionContext| {
            ctx.modify(Modification::data(json!(1)));
            ctx.cancel("too late");
            Ok(MiddlewareFlow::Continue)
        }));

        let err = run_chain(&[both], &mut ctx(), &graph()).await.unwrap_err();
        assert!(matches!(err, MiddlewareError::ExclusivityViolation { .. }));
    }

    #[tokio::test]
    async fn test_middleware_error_is_wrapped() {
        let failing: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("failing", |_ctx: &mut TransitionContext| {
            anyhow::bail!("database down")
        }));

        let err = run_chain(&[failing], &mut ctx(), &graph()).await.unwrap_err();
        assert_eq!(err.to_string(), "Middleware 'failing' failed: database down");
    }
}

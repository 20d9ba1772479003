//! Transition conditions.
//!
//! A condition is a side-effect-free predicate over the current stage and
//! payload that gates a transition. Conditions may be asynchronous.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;

/// Input handed to a condition.
#[derive(Debug, Clone)]
pub struct ConditionContext {
    /// The current stage.
    pub stage: String,
    /// The current stage payload.
    pub data: Value,
    /// The event being resolved, if any.
    pub event: Option<String>,
    /// The candidate target stage.
    pub target: String,
}

/// Trait for transition conditions.
#[async_trait]
pub trait Condition: Send + Sync {
    /// Returns whether the transition may be taken.
    ///
    /// An error aborts the transition and is surfaced to the caller.
    async fn evaluate(&self, ctx: &ConditionContext) -> anyhow::Result<bool>;
}

/// A condition backed by a synchronous predicate.
pub struct FnCondition<F>
where
    F: Fn(&ConditionContext) -> bool + Send + Sync,
{
    func: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&ConditionContext) -> bool + Send + Sync,
{
    /// Creates a new predicate condition.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnCondition<F>
where
    F: Fn(&ConditionContext) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCondition").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Condition for FnCondition<F>
where
    F: Fn(&ConditionContext) -> bool + Send + Sync,
{
    async fn evaluate(&self, ctx: &ConditionContext) -> anyhow::Result<bool> {
        Ok((self.func)(ctx))
    }
}

/// A condition backed by a fallible synchronous function.
pub struct TryFnCondition<F>
where
    F: Fn(&ConditionContext) -> anyhow::Result<bool> + Send + Sync,
{
    func: F,
}

impl<F> TryFnCondition<F>
where
    F: Fn(&ConditionContext) -> anyhow::Result<bool> + Send + Sync,
{
    /// Creates a new fallible condition.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Condition for TryFnCondition<F>
where
    F: Fn(&ConditionContext) -> anyhow::Result<bool> + Send + Sync,
{
    async fn evaluate(&self, ctx: &ConditionContext) -> anyhow::Result<bool> {
        (self.func)(ctx)
    }
}

/// A condition backed by an async function.
pub struct AsyncFnCondition<F, Fut>
where
    F: Fn(ConditionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    func: F,
    _phantom: std::marker::PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnCondition<F, Fut>
where
    F: Fn(ConditionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    /// Creates a new async condition.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Condition for AsyncFnCondition<F, Fut>
where
    F: Fn(ConditionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    async fn evaluate(&self, ctx: &ConditionContext) -> anyhow::Result<bool> {
        (self.func)(ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(data: Value) -> ConditionContext {
        ConditionContext {
            stage: "form".to_string(),
            data,
            event: Some("SUBMIT".to_string()),
            target: "done".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fn_condition() {
        let condition = FnCondition::new(|ctx: &ConditionContext| ctx.data["valid"] == json!(true));

        assert!(condition.evaluate(&ctx(json!({"valid": true}))).await.unwrap());
        assert!(!condition.evaluate(&ctx(json!({"valid": false}))).await.unwrap());
    }

    #[tokio::test]
    async fn test_try_fn_condition_propagates_error() {
        let condition = TryFnCondition::new(|_ctx: &ConditionContext| -> anyhow::Result<bool> {
            anyhow::bail!("no data")
        });
        assert!(condition.evaluate(&ctx(Value::Null)).await.is_err());
    }

    #[test]
    fn test_condition_outside_runtime() {
        let condition = FnCondition::new(|ctx: &ConditionContext| ctx.target == "done");
        assert!(tokio_test::block_on(condition.evaluate(&ctx(Value::Null))).unwrap());
    }

    #[tokio::test]
    async fn test_async_fn_condition() {
        let condition = AsyncFnCondition::new(|ctx: ConditionContext| async move {
            tokio::task::yield_now().await;
            Ok::<_, anyhow::Error>(ctx.event.as_deref() == Some("SUBMIT"))
        });

        assert!(condition.evaluate(&ctx(Value::Null)).await.unwrap());
    }
}

//! Mock plugins and middleware for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Modification, TransitionContext};
use crate::engine::StageFlowEngine;
use crate::errors::PluginHook;
use crate::middleware::{Middleware, MiddlewareFlow};
use crate::plugins::Plugin;

/// A log shared between mocks, in call order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A plugin that records every hook call as `"<name>:<hook>[:<detail>]"`.
///
/// Transition hooks record `from->to`; stage hooks record the stage.
#[derive(Debug)]
pub struct RecordingPlugin {
    name: String,
    dependencies: Vec<String>,
    log: CallLog,
    failing_on: Option<PluginHook>,
    slow_on: Option<(PluginHook, Duration)>,
}

impl RecordingPlugin {
    /// Creates a plugin with its own log.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            log: Self::shared_log(),
            failing_on: None,
            slow_on: None,
        }
    }

    /// Creates an empty log to share between mocks.
    #[must_use]
    pub fn shared_log() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Records into `log` instead of a private log.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Declares a dependency.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Makes `hook` fail after recording the call.
    #[must_use]
    pub fn failing_on(mut self, hook: PluginHook) -> Self {
        self.failing_on = Some(hook);
        self
    }

    /// Makes `hook` sleep for `ms` before recording.
    #[must_use]
    pub fn slow_on(mut self, hook: PluginHook, ms: u64) -> Self {
        self.slow_on = Some((hook, Duration::from_millis(ms)));
        self
    }

    /// The recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    async fn record(&self, hook: PluginHook, detail: Option<String>) -> anyhow::Result<()> {
        if let Some((slow, delay)) = self.slow_on {
            if slow == hook {
                tokio::time::sleep(delay).await;
            }
        }
        let entry = match detail {
            Some(detail) => format!("{}:{hook}:{detail}", self.name),
            None => format!("{}:{hook}", self.name),
        };
        self.log.lock().push(entry);
        if self.failing_on == Some(hook) {
            anyhow::bail!("{} failed in {hook}", self.name);
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn install(&self, _engine: &StageFlowEngine) -> anyhow::Result<()> {
        self.record(PluginHook::Install, None).await
    }

    async fn uninstall(&self, _engine: &StageFlowEngine) -> anyhow::Result<()> {
        self.record(PluginHook::Uninstall, None).await
    }

    async fn before_transition(&self, ctx: &TransitionContext) -> anyhow::Result<()> {
        self.record(
            PluginHook::BeforeTransition,
            Some(format!("{}->{}", ctx.from(), ctx.to())),
        )
        .await
    }

    async fn after_transition(&self, ctx: &TransitionContext) -> anyhow::Result<()> {
        self.record(
            PluginHook::AfterTransition,
            Some(format!("{}->{}", ctx.from(), ctx.to())),
        )
        .await
    }

    async fn on_stage_enter(&self, stage: &str, _data: &Value) -> anyhow::Result<()> {
        self.record(PluginHook::StageEnter, Some(stage.to_string())).await
    }

    async fn on_stage_exit(&self, stage: &str, _data: &Value) -> anyhow::Result<()> {
        self.record(PluginHook::StageExit, Some(stage.to_string())).await
    }
}

/// A middleware that records its name and continues.
#[derive(Debug)]
pub struct RecordingMiddleware {
    name: String,
    log: CallLog,
}

impl RecordingMiddleware {
    /// Creates a recording middleware writing to `log`.
    #[must_use]
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl Middleware for RecordingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow> {
        self.log.lock().push(self.name.clone());
        Ok(MiddlewareFlow::Continue)
    }
}

/// A middleware that cancels every transition.
#[derive(Debug)]
pub struct CancellingMiddleware {
    name: String,
    reason: String,
}

impl CancellingMiddleware {
    /// Creates a cancelling middleware.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Middleware for CancellingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow> {
        ctx.cancel(self.reason.clone());
        Ok(MiddlewareFlow::Continue)
    }
}

/// A middleware that applies a fixed modification.
#[derive(Debug)]
pub struct ModifyingMiddleware {
    name: String,
    modification: Modification,
}

impl ModifyingMiddleware {
    /// Creates a modifying middleware.
    #[must_use]
    pub fn new(name: impl Into<String>, modification: Modification) -> Self {
        Self {
            name: name.into(),
            modification,
        }
    }
}

#[async_trait]
impl Middleware for ModifyingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow> {
        ctx.modify(self.modification.clone());
        Ok(MiddlewareFlow::Continue)
    }
}

/// A middleware that always errors.
#[derive(Debug)]
pub struct FailingMiddleware {
    name: String,
    error: String,
}

impl FailingMiddleware {
    /// Creates a failing middleware.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }
}

#[async_trait]
impl Middleware for FailingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow> {
        anyhow::bail!("{}", self.error)
    }
}

/// A middleware that takes time before continuing.
#[derive(Debug)]
pub struct SlowMiddleware {
    name: String,
    delay: Duration,
}

impl SlowMiddleware {
    /// Creates a slow middleware.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }

    /// Creates a slow middleware with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }
}

#[async_trait]
impl Middleware for SlowMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow> {
        tokio::time::sleep(self.delay).await;
        Ok(MiddlewareFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransitionTrigger;

    fn ctx() -> TransitionContext {
        TransitionContext::new("a", "b", TransitionTrigger::Direct, Value::Null)
    }

    #[tokio::test]
    async fn test_recording_plugin_formats_entries() {
        let plugin = RecordingPlugin::new("p");
        plugin.before_transition(&ctx()).await.unwrap();
        plugin.on_stage_enter("b", &Value::Null).await.unwrap();

        assert_eq!(plugin.calls(), vec!["p:before_transition:a->b", "p:on_stage_enter:b"]);
    }

    #[tokio::test]
    async fn test_recording_plugin_failing_hook_still_records() {
        let plugin = RecordingPlugin::new("p").failing_on(PluginHook::StageExit);
        assert!(plugin.on_stage_exit("a", &Value::Null).await.is_err());
        assert_eq!(plugin.calls(), vec!["p:on_stage_exit:a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_plugin_slow_hook() {
        let plugin = RecordingPlugin::new("p").slow_on(PluginHook::StageEnter, 500);
        let started = tokio::time::Instant::now();
        plugin.on_stage_exit("a", &Value::Null).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);

        plugin.on_stage_enter("b", &Value::Null).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert_eq!(plugin.calls(), vec!["p:on_stage_exit:a", "p:on_stage_enter:b"]);
    }

    #[tokio::test]
    async fn test_cancelling_middleware() {
        let mut ctx = ctx();
        CancellingMiddleware::new("guard", "closed")
            .handle(&mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.cancel_reason(), Some("closed"));
    }
}

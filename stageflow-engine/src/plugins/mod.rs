//! Plugins: installable extensions with lifecycle hooks.
//!
//! For one committed transition hooks fire in this order:
//! `before_transition` (all plugins) → middleware → `on_stage_exit` (old
//! stage) → commit → `on_stage_enter` (new stage) → `after_transition` →
//! subscribers. Plugins are visited in installation order. A hook a plugin
//! does not override is a no-op.

mod manager;

pub use manager::PluginManager;

use crate::core::TransitionContext;
use crate::engine::StageFlowEngine;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for engine plugins.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The unique plugin name.
    fn name(&self) -> &str;

    /// Names of plugins that must be installed first.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once when the plugin is installed.
    ///
    /// The plugin may register middleware or subscribers on `engine`.
    async fn install(&self, engine: &StageFlowEngine) -> anyhow::Result<()>;

    /// Called before the plugin is removed from the registry.
    async fn uninstall(&self, _engine: &StageFlowEngine) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called before the middleware pipeline runs.
    async fn before_transition(&self, _ctx: &TransitionContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after a transition has been committed.
    async fn after_transition(&self, _ctx: &TransitionContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when `stage` becomes current.
    async fn on_stage_enter(&self, _stage: &str, _data: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when `stage` stops being current.
    async fn on_stage_exit(&self, _stage: &str, _data: &Value) -> anyhow::Result<()> {
        Ok(())
    }
}

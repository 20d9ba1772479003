//! Ordered plugin registry and hook dispatch.

use super::Plugin;
use crate::core::TransitionContext;
use crate::errors::{PluginError, PluginHook};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Registry of installed plugins, kept in installation order.
///
/// Names are unique, and a plugin can only be registered once all of its
/// declared dependencies are present.
#[derive(Default, Clone)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `plugin` could be registered now.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInstalled` for a taken name, or `MissingDependency`
    /// for the first declared dependency that is not installed.
    pub fn check_installable(&self, plugin: &dyn Plugin) -> Result<(), PluginError> {
        let name = plugin.name();
        if self.contains(name) {
            return Err(PluginError::AlreadyInstalled(name.to_string()));
        }
        for dependency in plugin.dependencies() {
            if !self.contains(&dependency) {
                return Err(PluginError::MissingDependency {
                    plugin: name.to_string(),
                    dependency,
                });
            }
        }
        Ok(())
    }

    /// Validates and registers a plugin. Does not run its install hook.
    ///
    /// # Errors
    ///
    /// See [`PluginManager::check_installable`].
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        self.check_installable(plugin.as_ref())?;
        debug!(plugin = plugin.name(), "Plugin registered");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Checks that `name` could be removed now and returns it.
    ///
    /// # Errors
    ///
    /// Returns `NotInstalled` for an unknown name, or `HasDependents` if
    /// another installed plugin declares it as a dependency.
    pub fn check_removable(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        let plugin = self
            .get(name)
            .ok_or_else(|| PluginError::NotInstalled(name.to_string()))?;

        let dependents: Vec<String> = self
            .plugins
            .iter()
            .filter(|p| p.name() != name && p.dependencies().iter().any(|d| d == name))
            .map(|p| p.name().to_string())
            .collect();
        if !dependents.is_empty() {
            return Err(PluginError::HasDependents {
                plugin: name.to_string(),
                dependents,
            });
        }
        Ok(plugin)
    }

    /// Removes a plugin by name. Does not run its uninstall hook.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Plugin>> {
        let position = self.plugins.iter().position(|p| p.name() == name)?;
        debug!(plugin = name, "Plugin unregistered");
        Some(self.plugins.remove(position))
    }

    /// Looks up a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name).cloned()
    }

    /// Whether `name` is installed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Installed plugin names in installation order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// A cloned list of installed plugins for hook dispatch.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.clone()
    }

    /// Returns the number of installed plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if no plugin is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs `before_transition` on every plugin, stopping at the first error.
    pub async fn before_transition(
        plugins: &[Arc<dyn Plugin>],
        ctx: &TransitionContext,
    ) -> Result<(), PluginError> {
        for plugin in plugins {
            plugin
                .before_transition(ctx)
                .await
                .map_err(|source| hook_failed(plugin.as_ref(), PluginHook::BeforeTransition, source))?;
        }
        Ok(())
    }

    /// Runs `after_transition` on every plugin, stopping at the first error.
    pub async fn after_transition(
        plugins: &[Arc<dyn Plugin>],
        ctx: &TransitionContext,
    ) -> Result<(), PluginError> {
        for plugin in plugins {
            plugin
                .after_transition(ctx)
                .await
                .map_err(|source| hook_failed(plugin.as_ref(), PluginHook::AfterTransition, source))?;
        }
        Ok(())
    }

    /// Runs `on_stage_enter` on every plugin, stopping at the first error.
    pub async fn stage_enter(
        plugins: &[Arc<dyn Plugin>],
        stage: &str,
        data: &Value,
    ) -> Result<(), PluginError> {
        for plugin in plugins {
            plugin
                .on_stage_enter(stage, data)
                .await
                .map_err(|source| hook_failed(plugin.as_ref(), PluginHook::StageEnter, source))?;
        }
        Ok(())
    }

    /// Runs `on_stage_exit` on every plugin, stopping at the first error.
    pub async fn stage_exit(
        plugins: &[Arc<dyn Plugin>],
        stage: &str,
        data: &Value,
    ) -> Result<(), PluginError> {
        for plugin in plugins {
            plugin
                .on_stage_exit(stage, data)
                .await
                .map_err(|source| hook_failed(plugin.as_ref(), PluginHook::StageExit, source))?;
        }
        Ok(())
    }
}

fn hook_failed(plugin: &dyn Plugin, hook: PluginHook, source: anyhow::Error) -> PluginError {
    PluginError::HookFailed {
        plugin: plugin.name().to_string(),
        hook,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPlugin;

    #[test]
    fn test_dependency_must_be_installed_first() {
        let mut manager = PluginManager::new();
        let b = Arc::new(RecordingPlugin::new("B").with_dependency("A"));

        let err = manager.register(b.clone()).unwrap_err();
        assert!(matches!(
            err,
            PluginError::MissingDependency { ref plugin, ref dependency } if plugin == "B" && dependency == "A"
        ));

        manager.register(Arc::new(RecordingPlugin::new("A"))).unwrap();
        manager.register(b).unwrap();
        assert_eq!(manager.names(), vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(RecordingPlugin::new("A"))).unwrap();
        assert!(matches!(
            manager.register(Arc::new(RecordingPlugin::new("A"))),
            Err(PluginError::AlreadyInstalled(_))
        ));
    }

    #[test]
    fn test_removal_blocked_by_dependents() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(RecordingPlugin::new("A"))).unwrap();
        manager
            .register(Arc::new(RecordingPlugin::new("B").with_dependency("A")))
            .unwrap();

        assert!(matches!(
            manager.check_removable("A"),
            Err(PluginError::HasDependents { .. })
        ));
        assert!(manager.check_removable("B").is_ok());
        assert!(matches!(
            manager.check_removable("C"),
            Err(PluginError::NotInstalled(_))
        ));

        manager.unregister("B");
        assert!(manager.check_removable("A").is_ok());
    }

    #[tokio::test]
    async fn test_hooks_run_in_installation_order() {
        let log = RecordingPlugin::shared_log();
        let plugins: Vec<Arc<dyn Plugin>> = vec![
            Arc::new(RecordingPlugin::new("first").with_log(log.clone())),
            Arc::new(RecordingPlugin::new("second").with_log(log.clone())),
        ];

        PluginManager::stage_enter(&plugins, "idle", &Value::Null).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["first:on_stage_enter:idle", "second:on_stage_enter:idle"]
        );
    }

    #[tokio::test]
    async fn test_hook_error_stops_dispatch() {
        let log = RecordingPlugin::shared_log();
        let plugins: Vec<Arc<dyn Plugin>> = vec![
            Arc::new(
                RecordingPlugin::new("broken")
                    .with_log(log.clone())
                    .failing_on(PluginHook::StageExit),
            ),
            Arc::new(RecordingPlugin::new("after").with_log(log.clone())),
        ];

        let err = PluginManager::stage_exit(&plugins, "idle", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::HookFailed { hook: PluginHook::StageExit, .. }));
        assert!(log.lock().iter().all(|entry| !entry.starts_with("after")));
    }
}

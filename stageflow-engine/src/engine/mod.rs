//! The stage flow engine.
//!
//! [`StageFlowEngine`] owns the state store, the global middleware, the
//! plugin registry and the timers of one flow. It is a cheap, cloneable
//! handle: every clone drives the same engine.
//!
//! All state-changing operations (`send`, `go_to`, `set_stage_data`,
//! `reset`, snapshot and timer-state restores, and timer firings) pass
//! through one single-flight gate, so at most one transition runs at a
//! time. Hooks and middleware run while the gate is held and must not await
//! another state-changing call on the same engine.

mod subscribers;
mod transition;


pub use subscribers::{Subscriber, SubscriberRegistry, Subscription};

use crate::config::{BusyPolicy, EngineOptions, FlowConfig, StageGraph, StartPolicy};
use crate::core::{HistoryEntry, StageSnapshot, StateStore, TransitionTrigger};
use crate::errors::{EngineResult, PluginError, PluginHook, TimerError, TransitionError};
use crate::events::{EngineEvent, EventSink};
use crate::middleware::{Middleware, MiddlewarePipeline};
use crate::plugins::{Plugin, PluginManager};
use crate::timers::{state, TimerCallback, TimerManager, TimerRecord};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::MutexGuard;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How one `send`, `go_to` or timer firing ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The transition committed.
    Committed {
        /// The stage that was left.
        from: String,
        /// The stage that was entered.
        to: String,
    },
    /// No transition matched the event, or every candidate's condition
    /// was false. Nothing changed.
    NoMatch,
    /// A middleware cancelled the transition. Nothing changed.
    Cancelled {
        /// The reason given by the middleware.
        reason: String,
    },
    /// A middleware halted the pipeline. Nothing changed.
    Halted {
        /// The halting middleware.
        middleware: String,
    },
}

impl TransitionOutcome {
    /// Whether the transition committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// The entered stage, for committed transitions.
    #[must_use]
    pub fn committed_stage(&self) -> Option<&str> {
        match self {
            Self::Committed { to, .. } => Some(to),
            _ => None,
        }
    }
}

pub(crate) struct EngineInner {
    graph: StageGraph,
    options: EngineOptions,
    event_sink: Arc<dyn EventSink>,
    configured_plugins: Vec<Arc<dyn Plugin>>,
    store: RwLock<StateStore>,
    middleware: RwLock<MiddlewarePipeline>,
    plugins: RwLock<PluginManager>,
    timers: Mutex<TimerManager>,
    subscribers: SubscriberRegistry,
    gate: tokio::sync::Mutex<()>,
    plugin_gate: tokio::sync::Mutex<()>,
    active: AtomicBool,
}

/// A running stage flow.
///
/// # Example
///
/// ```rust,ignore
/// let config = FlowBuilder::new("idle")
///     .stage(StageDefinition::new("idle").transition(TransitionDefinition::to("busy").on("GO")))
///     .stage(StageDefinition::new("busy"))
///     .build()?;
///
/// let engine = StageFlowEngine::new(config)?;
/// engine.start().await?;
/// engine.send("GO", None).await?;
/// assert_eq!(engine.current_stage(), "busy");
/// ```
#[derive(Clone)]
pub struct StageFlowEngine {
    inner: Arc<EngineInner>,
}

impl StageFlowEngine {
    /// Builds an engine from a flow configuration.
    ///
    /// The configuration is validated and its middleware registered. Its
    /// plugins are installed by [`StageFlowEngine::start`].
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` for an invalid flow.
    pub fn new(config: FlowConfig) -> EngineResult<Self> {
        let graph = config.validate()?;

        let mut pipeline = MiddlewarePipeline::new();
        for middleware in config.middleware {
            pipeline.add(middleware)?;
        }

        let initial_data = initial_data(&graph);
        let store = StateStore::new(
            graph.initial(),
            initial_data,
            config.options.history_limit,
        );

        let inner = Arc::new_cyclic(|weak: &Weak<EngineInner>| {
            let weak = weak.clone();
            let callback: TimerCallback = Arc::new(move |firing| {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        StageFlowEngine { inner }.fire_timer(firing).await;
                    }
                }
                .boxed()
            });

            EngineInner {
                graph,
                options: config.options,
                event_sink: config.event_sink,
                configured_plugins: config.plugins,
                store: RwLock::new(store),
                middleware: RwLock::new(pipeline),
                plugins: RwLock::new(PluginManager::new()),
                timers: Mutex::new(TimerManager::new(callback)),
                subscribers: SubscriberRegistry::new(),
                gate: tokio::sync::Mutex::new(()),
                plugin_gate: tokio::sync::Mutex::new(()),
                active: AtomicBool::new(false),
            }
        });

        debug!(
            initial = inner.graph.initial(),
            stages = inner.graph.stage_count(),
            "Engine created"
        );
        Ok(Self { inner })
    }

    // --- Lifecycle ---

    /// Activates the engine.
    ///
    /// Installs configured plugins that are not yet installed, seeds the
    /// store and history with the initial stage, runs `on_stage_enter` for
    /// it, arms its delayed transitions and takes any automatic transition
    /// whose condition already holds.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyStarted` under [`StartPolicy::Reject`], or the error
    /// of a failing plugin install or `on_stage_enter` hook. A failed start
    /// leaves the engine inactive.
    pub async fn start(&self) -> EngineResult<()> {
        let _gate = self.inner.gate.lock().await;

        if self.is_active() {
            return match self.inner.options.start_policy {
                StartPolicy::Ignore => {
                    debug!("Engine already started");
                    Ok(())
                }
                StartPolicy::Reject => Err(TransitionError::AlreadyStarted.into()),
            };
        }

        for plugin in &self.inner.configured_plugins {
            let installed = self.inner.plugins.read().contains(plugin.name());
            if !installed {
                self.install_plugin(plugin.clone()).await?;
            }
        }

        let initial = self.inner.graph.initial().to_string();
        let data = initial_data(&self.inner.graph);
        self.inner.store.write().reset_to(&initial, data.clone());
        self.inner.active.store(true, Ordering::SeqCst);

        let plugins = self.inner.plugins.read().snapshot();
        if let Err(err) = PluginManager::stage_enter(&plugins, &initial, &data).await {
            self.inner.active.store(false, Ordering::SeqCst);
            warn!(stage = %initial, error = %err, "Engine start failed");
            return Err(err.into());
        }

        if self.inner.options.arm_initial_timers {
            self.arm_stage_timers(&initial);
        }

        self.emit(&EngineEvent::started(&initial));
        info!(stage = %initial, "Engine started");
        self.run_automatic().await;
        Ok(())
    }

    /// Deactivates the engine and cancels every timer. Idempotent.
    ///
    /// The current stage and data are kept. Plugins stay installed.
    pub async fn stop(&self) {
        let _gate = self.inner.gate.lock().await;
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let cancelled = self.inner.timers.lock().cancel_all();
        self.emit_cancelled(&cancelled);

        let stage = self.current_stage();
        self.emit(&EngineEvent::stopped(&stage));
        info!(stage = %stage, timers_cancelled = cancelled.len(), "Engine stopped");
    }

    /// Returns to the initial stage and data.
    ///
    /// Bypasses middleware and plugin hooks. History is cleared down to the
    /// initial entry and all timers are cancelled. While active, the initial
    /// stage's timers are re-armed when [`EngineOptions::arm_initial_timers`]
    /// is set, and its automatic transitions are evaluated. Subscribers are
    /// notified.
    ///
    /// # Errors
    ///
    /// Returns `Busy` under [`BusyPolicy::Reject`] while a transition runs.
    pub async fn reset(&self) -> EngineResult<()> {
        let _gate = self.acquire().await?;

        let cancelled = self.inner.timers.lock().cancel_all();
        self.emit_cancelled(&cancelled);

        let initial = self.inner.graph.initial().to_string();
        let data = initial_data(&self.inner.graph);
        self.inner.store.write().reset_to(&initial, data.clone());

        let active = self.is_active();
        if active && self.inner.options.arm_initial_timers {
            self.arm_stage_timers(&initial);
        }
        self.inner.subscribers.notify(&initial, &data);
        info!(stage = %initial, "Engine reset");
        if active {
            self.run_automatic().await;
        }
        Ok(())
    }

    // --- Transitions ---

    /// Resolves `event` against the current stage's transitions.
    ///
    /// Candidates are tried in declaration order; the first whose condition
    /// holds is run through the pipeline. `data` replaces the payload; when
    /// omitted the target stage's initial data is used.
    ///
    /// After a commit, automatic transitions out of the entered stage are
    /// taken. The returned outcome describes the requested transition only.
    ///
    /// # Errors
    ///
    /// Returns `NotActive` before `start` or after `stop`, `Busy` under
    /// [`BusyPolicy::Reject`], `ConditionFailed` when a condition errors,
    /// and middleware or plugin errors from the pipeline.
    pub async fn send(&self, event: &str, data: Option<Value>) -> EngineResult<TransitionOutcome> {
        self.ensure_active()?;
        let _gate = self.acquire().await?;
        self.ensure_active()?;

        let (stage, current_data) = self.current_state();
        let definition = self
            .inner
            .graph
            .get(&stage)
            .ok_or_else(|| TransitionError::UnknownStage(stage.clone()))?;

        for transition in definition.transitions.iter().filter(|t| t.matches_event(event)) {
            if !self
                .condition_allows(&stage, &current_data, Some(event), transition)
                .await?
            {
                debug!(stage = %stage, event, target = %transition.target, "Condition rejected transition");
                continue;
            }
            let outcome = self
                .run_transition(
                    &transition.target,
                    TransitionTrigger::Event(event.to_string()),
                    data,
                    &transition.middleware,
                )
                .await?;
            if outcome.is_committed() {
                self.run_automatic().await;
            }
            return Ok(outcome);
        }

        debug!(stage = %stage, event, "No transition matched");
        Ok(TransitionOutcome::NoMatch)
    }

    /// Moves to `stage` directly, without matching an event or evaluating
    /// conditions. Global middleware and plugin hooks still run.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStage` for an undeclared stage, plus the errors
    /// documented on [`StageFlowEngine::send`].
    pub async fn go_to(&self, stage: &str, data: Option<Value>) -> EngineResult<TransitionOutcome> {
        self.ensure_active()?;
        if !self.inner.graph.contains(stage) {
            return Err(TransitionError::UnknownStage(stage.to_string()).into());
        }
        let _gate = self.acquire().await?;
        self.ensure_active()?;

        let outcome = self
            .run_transition(stage, TransitionTrigger::Direct, data, &[])
            .await?;
        if outcome.is_committed() {
            self.run_automatic().await;
        }
        Ok(outcome)
    }

    /// Replaces the current payload without changing stage.
    ///
    /// Bypasses middleware and plugin hooks and does not touch history.
    /// Subscribers are notified, then automatic transitions are evaluated
    /// against the new payload.
    ///
    /// # Errors
    ///
    /// Returns `NotActive` or `Busy` as for [`StageFlowEngine::send`].
    pub async fn set_stage_data(&self, data: Value) -> EngineResult<()> {
        self.ensure_active()?;
        let _gate = self.acquire().await?;
        self.ensure_active()?;

        let stage = {
            let mut store = self.inner.store.write();
            store.set_data(data.clone());
            store.current_stage().to_string()
        };
        self.inner.subscribers.notify(&stage, &data);
        self.run_automatic().await;
        Ok(())
    }

    /// Registers a listener called with `(stage, data)` after every
    /// committed change, in registration order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(Arc::new(listener))
    }

    // --- Plugins and middleware ---

    /// Installs a plugin and runs its `install` hook.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInstalled`, `MissingDependency`, or `HookFailed` if
    /// the install hook errors, in which case nothing is registered.
    ///
    /// Installs and uninstalls run one at a time; their hooks must not
    /// install or uninstall plugins on the same engine.
    pub async fn install_plugin(&self, plugin: Arc<dyn Plugin>) -> EngineResult<()> {
        let _plugin_gate = self.inner.plugin_gate.lock().await;
        self.inner.plugins.read().check_installable(plugin.as_ref())?;

        plugin
            .install(self)
            .await
            .map_err(|source| PluginError::HookFailed {
                plugin: plugin.name().to_string(),
                hook: PluginHook::Install,
                source,
            })?;

        let name = plugin.name().to_string();
        self.inner.plugins.write().register(plugin)?;
        info!(plugin = %name, "Plugin installed");
        Ok(())
    }

    /// Runs a plugin's `uninstall` hook and removes it.
    ///
    /// # Errors
    ///
    /// Returns `NotInstalled`, `HasDependents` while another plugin depends
    /// on it, or `HookFailed` if the uninstall hook errors, in which case
    /// the plugin stays installed.
    pub async fn uninstall_plugin(&self, name: &str) -> EngineResult<()> {
        let _plugin_gate = self.inner.plugin_gate.lock().await;
        let plugin = self.inner.plugins.read().check_removable(name)?;

        plugin
            .uninstall(self)
            .await
            .map_err(|source| PluginError::HookFailed {
                plugin: name.to_string(),
                hook: PluginHook::Uninstall,
                source,
            })?;

        self.inner.plugins.write().unregister(name);
        info!(plugin = name, "Plugin uninstalled");
        Ok(())
    }

    /// Appends a global middleware. It applies to the next transition.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the name is taken.
    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) -> EngineResult<()> {
        let name = middleware.name().to_string();
        self.inner.middleware.write().add(middleware)?;
        debug!(middleware = %name, "Middleware added");
        Ok(())
    }

    /// Removes a global middleware by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name.
    pub fn remove_middleware(&self, name: &str) -> EngineResult<()> {
        self.inner.middleware.write().remove(name)?;
        debug!(middleware = name, "Middleware removed");
        Ok(())
    }

    // --- Queries ---

    /// The current stage.
    #[must_use]
    pub fn current_stage(&self) -> String {
        self.inner.store.read().current_stage().to_string()
    }

    /// The current payload.
    #[must_use]
    pub fn current_data(&self) -> Value {
        self.inner.store.read().data().clone()
    }

    /// The effect descriptor of the current stage, if any.
    #[must_use]
    pub fn current_stage_effect(&self) -> Option<Value> {
        let stage = self.current_stage();
        self.stage_effect(&stage)
    }

    /// The effect descriptor of `stage`, if it is declared and has one.
    #[must_use]
    pub fn stage_effect(&self, stage: &str) -> Option<Value> {
        self.inner.graph.get(stage).and_then(|s| s.effect.clone())
    }

    /// Committed stages, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.store.read().history().entries()
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.inner.store.read().is_transitioning()
    }

    /// Whether the engine has been started and not stopped.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Events the current stage responds to.
    #[must_use]
    pub fn available_events(&self) -> Vec<String> {
        let stage = self.current_stage();
        self.inner
            .graph
            .get(&stage)
            .map(crate::config::StageDefinition::events)
            .unwrap_or_default()
    }

    /// Installed plugin names, in installation order.
    #[must_use]
    pub fn installed_plugins(&self) -> Vec<String> {
        self.inner.plugins.read().names()
    }

    /// Global middleware names, in execution order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<String> {
        self.inner.middleware.read().names()
    }

    /// The validated stage graph.
    #[must_use]
    pub fn graph(&self) -> &StageGraph {
        &self.inner.graph
    }

    // --- Timers ---

    /// Every live timer, in creation order.
    #[must_use]
    pub fn active_timers(&self) -> Vec<TimerRecord> {
        self.inner.timers.lock().records()
    }

    /// Live timers owned by `stage`.
    #[must_use]
    pub fn stage_timers(&self, stage: &str) -> Vec<TimerRecord> {
        self.inner.timers.lock().stage_records(stage)
    }

    /// The shortest remaining time among the current stage's timers.
    #[must_use]
    pub fn timer_remaining_time(&self) -> Option<Duration> {
        let stage = self.current_stage();
        self.inner.timers.lock().remaining_for_stage(&stage)
    }

    /// Whether the current stage has timers and all of them are paused.
    #[must_use]
    pub fn are_timers_paused(&self) -> bool {
        let stage = self.current_stage();
        self.inner.timers.lock().all_paused(&stage)
    }

    /// Pauses the current stage's timers, keeping their remaining time.
    /// Returns how many were paused.
    pub fn pause_timers(&self) -> usize {
        let stage = self.current_stage();
        let count = self.inner.timers.lock().pause_stage(&stage);
        debug!(stage = %stage, count, "Timers paused");
        count
    }

    /// Resumes the current stage's paused timers from their remaining
    /// time. Returns how many were resumed.
    pub fn resume_timers(&self) -> usize {
        let stage = self.current_stage();
        let count = self.inner.timers.lock().resume_stage(&stage);
        debug!(stage = %stage, count, "Timers resumed");
        count
    }

    /// Cancels and re-arms the current stage's timers with their full
    /// configured durations.
    ///
    /// # Errors
    ///
    /// Returns `NotActive` before `start` or after `stop`.
    pub fn reset_timers(&self) -> EngineResult<Vec<TimerRecord>> {
        self.ensure_active()?;
        let stage = self.current_stage();
        let cancelled = self.inner.timers.lock().cancel_stage(&stage);
        self.emit_cancelled(&cancelled);
        Ok(self.arm_stage_timers(&stage))
    }

    /// Cancels one timer.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::NotFound` for an unknown id.
    pub fn cancel_timer(&self, id: &str) -> EngineResult<TimerRecord> {
        let record = self.inner.timers.lock().cancel(id)?;
        self.emit_cancelled(std::slice::from_ref(&record));
        Ok(record)
    }

    /// Encodes every live timer into an opaque, versioned string.
    ///
    /// # Errors
    ///
    /// Returns `MalformedState` if encoding fails.
    pub fn serialize_timer_state(&self) -> EngineResult<String> {
        let records = self.inner.timers.lock().records();
        Ok(state::encode(&records, Instant::now())?)
    }

    /// Replaces the current stage's timers with those in `encoded`.
    ///
    /// Every timer must belong to the current stage and point at one of
    /// its delayed transitions, at most one timer per transition. Validation completes before anything is
    /// replaced: on error the existing timers are untouched. Returns how
    /// many timers were restored.
    ///
    /// # Errors
    ///
    /// Returns `MalformedState`, `UnsupportedVersion` or `InvalidStage` for
    /// input that cannot be restored, and `NotActive` when stopped.
    pub async fn restore_timer_state(&self, encoded: &str) -> EngineResult<usize> {
        self.ensure_active()?;
        let timers = state::decode(encoded)?;
        let _gate = self.acquire().await?;

        let stage = self.current_stage();
        let definition = self
            .inner
            .graph
            .get(&stage)
            .ok_or_else(|| TransitionError::UnknownStage(stage.clone()))?;

        let mut indices = HashSet::new();
        for timer in &timers {
            if timer.stage != stage {
                return Err(TimerError::InvalidStage {
                    timer: timer.id.clone(),
                    stage: timer.stage.clone(),
                }
                .into());
            }
            let matches = definition
                .transitions
                .get(timer.transition_index)
                .is_some_and(|t| t.delay.is_some() && t.target == timer.target);
            if !matches {
                return Err(TimerError::MalformedState(format!(
                    "timer '{}' does not match a delayed transition of '{}'",
                    timer.id, stage
                ))
                .into());
            }
            if !indices.insert(timer.transition_index) {
                return Err(TimerError::MalformedState(format!(
                    "more than one timer for transition {} of '{}'",
                    timer.transition_index, stage
                ))
                .into());
            }
        }

        let now = Instant::now();
        let count = timers.len();
        let replaced = {
            let mut manager = self.inner.timers.lock();
            let replaced = manager.cancel_stage(&stage);
            for timer in timers {
                manager.insert(timer.into_record(now));
            }
            replaced
        };
        self.emit_cancelled(&replaced);
        info!(stage = %stage, count, "Timer state restored");
        Ok(count)
    }

    // --- Snapshots ---

    /// Captures the current stage and data, optionally expiring after `ttl`.
    #[must_use]
    pub fn snapshot(&self, ttl: Option<Duration>) -> StageSnapshot {
        let (stage, data) = self.current_state();
        let snapshot = StageSnapshot::new(stage, data);
        match ttl {
            Some(ttl) => snapshot.with_ttl(ttl),
            None => snapshot,
        }
    }

    /// Restores a snapshot, bypassing middleware and plugin hooks.
    ///
    /// The current stage's timers are cancelled and the restored stage's
    /// timers armed. A history entry is recorded and subscribers are
    /// notified. Returns `false`, changing nothing, if the snapshot expired.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStage` for a stage not in this flow, and `NotActive`
    /// or `Busy` as for [`StageFlowEngine::send`].
    pub async fn restore_snapshot(&self, snapshot: &StageSnapshot) -> EngineResult<bool> {
        self.ensure_active()?;
        if !self.inner.graph.contains(&snapshot.stage) {
            return Err(TransitionError::UnknownStage(snapshot.stage.clone()).into());
        }
        if snapshot.is_expired() {
            debug!(stage = %snapshot.stage, "Snapshot expired");
            return Ok(false);
        }
        let _gate = self.acquire().await?;

        let current = self.current_stage();
        let cancelled = self.inner.timers.lock().cancel_stage(&current);
        self.emit_cancelled(&cancelled);

        self.inner
            .store
            .write()
            .commit(&snapshot.stage, snapshot.data.clone());
        self.arm_stage_timers(&snapshot.stage);
        self.inner.subscribers.notify(&snapshot.stage, &snapshot.data);

        info!(stage = %snapshot.stage, "Snapshot restored");
        self.run_automatic().await;
        Ok(true)
    }

    // --- Internals ---

    fn ensure_active(&self) -> Result<(), TransitionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(TransitionError::NotActive)
        }
    }

    async fn acquire(&self) -> Result<MutexGuard<'_, ()>, TransitionError> {
        match self.inner.options.busy_policy {
            BusyPolicy::Queue => Ok(self.inner.gate.lock().await),
            BusyPolicy::Reject => self
                .inner
                .gate
                .try_lock()
                .map_err(|_| TransitionError::Busy),
        }
    }

    fn current_state(&self) -> (String, Value) {
        let store = self.inner.store.read();
        (store.current_stage().to_string(), store.data().clone())
    }

    fn arm_stage_timers(&self, stage: &str) -> Vec<TimerRecord> {
        let Some(definition) = self.inner.graph.get(stage) else {
            return Vec::new();
        };
        let armed = self.inner.timers.lock().arm_stage(definition);
        for record in &armed {
            self.emit(&EngineEvent::timer_scheduled(
                &record.id,
                &record.stage,
                &record.target,
                u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
            ));
        }
        armed
    }

    fn emit_cancelled(&self, records: &[TimerRecord]) {
        for record in records {
            self.emit(&EngineEvent::timer_cancelled(&record.id, &record.stage));
        }
    }

    fn emit(&self, event: &EngineEvent) {
        self.inner.event_sink.emit(event);
    }
}

impl std::fmt::Debug for StageFlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageFlowEngine")
            .field("current_stage", &self.current_stage())
            .field("active", &self.is_active())
            .field("plugins", &self.installed_plugins())
            .field("middleware", &self.middleware_names())
            .finish_non_exhaustive()
    }
}

fn initial_data(graph: &StageGraph) -> Value {
    graph
        .get(graph.initial())
        .and_then(|s| s.data.clone())
        .unwrap_or(Value::Null)
}

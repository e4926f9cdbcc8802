//! Reusable component test fixtures.
//!
//! - [`RecordingComponent`] logs every hook into an [`EventLog`].
//! - [`WorkerComponent`] has a fixed backlog of round-robin jobs.
//! - [`SlowComponent`] burns wall-clock time on every round-robin tick.
//! - [`FailingComponent`] returns an error from one chosen hook.
//! - [`PanickingComponent`] panics in one chosen hook.
//! - [`ConfigurableComponent`] round-trips typed settings through a blob.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gantry_core::{
    AttachContext, CapabilityId, CapabilitySet, Component, ComponentConfig, ComponentError,
    Factory, Phase, Provider,
};
use serde::{Deserialize, Serialize};

use crate::EventLog;

fn phase_suffix(phase: Phase) -> &'static str {
    match phase {
        Phase::Before => "before",
        Phase::After => "after",
    }
}

// ── RecordingComponent ──────────────────────────────────────────

/// Logs `"{name}:{hook}"` for every hook call.
///
/// Built with chained setters:
///
/// ```
/// use gantry_test_utils::{cap, EventLog, RecordingComponent};
///
/// let log = EventLog::new();
/// let renderer = RecordingComponent::new("renderer", &log)
///     .requires(cap("window"))
///     .supplies(cap("frames"))
///     .priority(2);
/// # let _ = renderer;
/// ```
pub struct RecordingComponent {
    name: String,
    log: EventLog,
    requires: CapabilitySet,
    supplies: CapabilitySet,
    priority: i32,
    busy: [usize; 2],
    persisted: bool,
    data: serde_json::Value,
    service: Option<Arc<dyn Any + Send + Sync>>,
    spawns: Vec<Factory>,
}

impl RecordingComponent {
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            requires: CapabilitySet::empty(),
            supplies: CapabilitySet::empty(),
            priority: 0,
            busy: [0; 2],
            persisted: false,
            data: serde_json::Value::Null,
            service: None,
            spawns: Vec::new(),
        }
    }

    pub fn requires(mut self, capability: CapabilityId) -> Self {
        self.requires.insert(capability);
        self
    }

    pub fn supplies(mut self, capability: CapabilityId) -> Self {
        self.supplies.insert(capability);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Report productive round-robin work for the first `rounds` ticks of
    /// each phase.
    pub fn busy_rounds(mut self, rounds: usize) -> Self {
        self.busy = [rounds; 2];
        self
    }

    /// Mark the component for persistence with the given payload.
    pub fn persisted(mut self, data: serde_json::Value) -> Self {
        self.persisted = true;
        self.data = data;
        self
    }

    pub fn with_service<T: Any + Send + Sync>(mut self, service: T) -> Self {
        self.service = Some(Arc::new(service));
        self
    }

    /// Register a component produced by `factory` from inside `on_attach`.
    pub fn spawns(mut self, factory: Factory) -> Self {
        self.spawns.push(factory);
        self
    }

    fn record(&self, hook: &str) {
        self.log.push(format!("{}:{hook}", self.name));
    }

    fn tick(&mut self, phase: Phase) -> Result<bool, ComponentError> {
        self.record(&format!("rr_{}", phase_suffix(phase)));
        let remaining = &mut self.busy[phase.index()];
        if *remaining == 0 {
            return Ok(false);
        }
        *remaining -= 1;
        Ok(true)
    }
}

impl Component for RecordingComponent {
    fn kind(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> CapabilitySet {
        self.requires.clone()
    }

    fn supplies(&self) -> CapabilitySet {
        self.supplies.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn save_to_storage(&self) -> bool {
        self.persisted
    }

    fn service(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.service.clone()
    }

    fn on_dependency_satisfied(&mut self, capability: &CapabilityId, provider: &Provider) {
        self.record(&format!("dep:{capability}={}", provider.kind()));
    }

    fn on_attach(&mut self, ctx: &AttachContext<'_>) -> Result<(), ComponentError> {
        self.record("attach");
        for spawn in &self.spawns {
            ctx.changes().register(spawn());
        }
        Ok(())
    }

    fn on_detach(&mut self) -> Result<(), ComponentError> {
        self.record("detach");
        Ok(())
    }

    fn load_configuration(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        self.record("load");
        self.data = config.data.clone();
        Ok(())
    }

    fn save_configuration(&self) -> Result<ComponentConfig, ComponentError> {
        Ok(ComponentConfig::with_data(self.name.clone(), self.data.clone()))
    }

    fn save(&mut self) -> Result<(), ComponentError> {
        self.record("save");
        Ok(())
    }

    fn update_before(&mut self) -> Result<(), ComponentError> {
        self.record("update_before");
        Ok(())
    }

    fn update_after(&mut self) -> Result<(), ComponentError> {
        self.record("update_after");
        Ok(())
    }

    fn tick_before_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.tick(Phase::Before)
    }

    fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.tick(Phase::After)
    }
}

// ── WorkerComponent ─────────────────────────────────────────────

/// Drains a fixed backlog of jobs, one per round-robin tick, in either phase.
///
/// The tick counter is shared so tests can read it after the component
/// has been moved into the orchestrator.
pub struct WorkerComponent {
    name: String,
    jobs: usize,
    ticks: Arc<AtomicUsize>,
}

impl WorkerComponent {
    pub fn new(name: impl Into<String>, jobs: usize) -> Self {
        Self {
            name: name.into(),
            jobs,
            ticks: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle on the number of round-robin ticks received so far.
    pub fn ticks(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.ticks)
    }

    fn work(&mut self) -> Result<bool, ComponentError> {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if self.jobs == 0 {
            return Ok(false);
        }
        self.jobs -= 1;
        Ok(true)
    }
}

impl Component for WorkerComponent {
    fn kind(&self) -> &str {
        &self.name
    }

    fn tick_before_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.work()
    }

    fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.work()
    }
}

// ── SlowComponent ───────────────────────────────────────────────

/// Sleeps for `cost` on every round-robin tick and always reports work.
///
/// Each tick logs the bare component name, so the log reads as the
/// sequence of entries the scheduler visited.
pub struct SlowComponent {
    name: String,
    cost: Duration,
    log: EventLog,
}

impl SlowComponent {
    pub fn new(name: impl Into<String>, cost: Duration, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            cost,
            log: log.clone(),
        }
    }

    fn burn(&mut self) -> Result<bool, ComponentError> {
        std::thread::sleep(self.cost);
        self.log.push(self.name.clone());
        Ok(true)
    }
}

impl Component for SlowComponent {
    fn kind(&self) -> &str {
        &self.name
    }

    fn tick_before_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.burn()
    }

    fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.burn()
    }
}

// ── FailingComponent / PanickingComponent ───────────────────────

/// The hook a [`FailingComponent`] or [`PanickingComponent`] misbehaves in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailingHook {
    /// `update_before` and `update_after`.
    Update,
    /// Both round-robin hooks.
    RoundRobin,
    Attach,
    Detach,
    LoadConfiguration,
    Save,
}

/// Returns [`ComponentError::Failed`] from one hook after `succeed_count`
/// successful calls to it. Every hook call is logged like
/// [`RecordingComponent`] does.
pub struct FailingComponent {
    name: String,
    hook: FailingHook,
    succeed_count: usize,
    calls: Arc<AtomicUsize>,
    log: EventLog,
}

impl FailingComponent {
    /// A component whose `hook` fails on every call.
    pub fn new(name: impl Into<String>, hook: FailingHook, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            hook,
            succeed_count: 0,
            calls: Arc::new(AtomicUsize::new(0)),
            log: log.clone(),
        }
    }

    /// Let the first `n` calls to the failing hook succeed.
    pub fn succeed_for(mut self, n: usize) -> Self {
        self.succeed_count = n;
        self
    }

    /// Handle on how many times the failing hook has been called.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn check(&self, hook: FailingHook, label: &str) -> Result<(), ComponentError> {
        self.log.push(format!("{}:{label}", self.name));
        if hook != self.hook {
            return Ok(());
        }
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(ComponentError::failed(format!(
                "{} failed in {label} (call {})",
                self.name,
                n + 1
            )));
        }
        Ok(())
    }
}

impl Component for FailingComponent {
    fn kind(&self) -> &str {
        &self.name
    }

    fn on_attach(&mut self, _ctx: &AttachContext<'_>) -> Result<(), ComponentError> {
        self.check(FailingHook::Attach, "attach")
    }

    fn on_detach(&mut self) -> Result<(), ComponentError> {
        self.check(FailingHook::Detach, "detach")
    }

    fn load_configuration(&mut self, _config: &ComponentConfig) -> Result<(), ComponentError> {
        self.check(FailingHook::LoadConfiguration, "load")
    }

    fn save(&mut self) -> Result<(), ComponentError> {
        self.check(FailingHook::Save, "save")
    }

    fn update_before(&mut self) -> Result<(), ComponentError> {
        self.check(FailingHook::Update, "update_before")
    }

    fn update_after(&mut self) -> Result<(), ComponentError> {
        self.check(FailingHook::Update, "update_after")
    }

    fn tick_before_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.check(FailingHook::RoundRobin, "rr_before")?;
        Ok(false)
    }

    fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.check(FailingHook::RoundRobin, "rr_after")?;
        Ok(false)
    }
}

/// Panics with `"{name} exploded"` inside one hook.
pub struct PanickingComponent {
    name: String,
    hook: FailingHook,
}

impl PanickingComponent {
    pub fn new(name: impl Into<String>, hook: FailingHook) -> Self {
        Self {
            name: name.into(),
            hook,
        }
    }

    fn maybe_panic(&self, hook: FailingHook) {
        if hook == self.hook {
            panic!("{} exploded", self.name);
        }
    }
}

impl Component for PanickingComponent {
    fn kind(&self) -> &str {
        &self.name
    }

    fn on_attach(&mut self, _ctx: &AttachContext<'_>) -> Result<(), ComponentError> {
        self.maybe_panic(FailingHook::Attach);
        Ok(())
    }

    fn on_detach(&mut self) -> Result<(), ComponentError> {
        self.maybe_panic(FailingHook::Detach);
        Ok(())
    }

    fn load_configuration(&mut self, _config: &ComponentConfig) -> Result<(), ComponentError> {
        self.maybe_panic(FailingHook::LoadConfiguration);
        Ok(())
    }

    fn save(&mut self) -> Result<(), ComponentError> {
        self.maybe_panic(FailingHook::Save);
        Ok(())
    }

    fn update_before(&mut self) -> Result<(), ComponentError> {
        self.maybe_panic(FailingHook::Update);
        Ok(())
    }

    fn update_after(&mut self) -> Result<(), ComponentError> {
        self.maybe_panic(FailingHook::Update);
        Ok(())
    }

    fn tick_before_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.maybe_panic(FailingHook::RoundRobin);
        Ok(false)
    }

    fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
        self.maybe_panic(FailingHook::RoundRobin);
        Ok(false)
    }
}

// ── ConfigurableComponent ───────────────────────────────────────

/// Typed settings persisted by [`ConfigurableComponent`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub label: String,
    pub level: i64,
}

/// A persisted component whose settings round-trip through
/// [`ComponentConfig::encode`] and [`ComponentConfig::decode`].
///
/// Every instance has kind [`ConfigurableComponent::KIND`], so a single
/// `KindRegistry` constructor can rebuild any number of them.
#[derive(Default)]
pub struct ConfigurableComponent {
    settings: Settings,
}

impl ConfigurableComponent {
    pub const KIND: &'static str = "configurable";

    pub fn new(label: impl Into<String>, level: i64) -> Self {
        Self {
            settings: Settings {
                label: label.into(),
                level,
            },
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl Component for ConfigurableComponent {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn save_to_storage(&self) -> bool {
        true
    }

    fn load_configuration(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        self.settings = config.decode()?;
        Ok(())
    }

    fn save_configuration(&self) -> Result<ComponentConfig, ComponentError> {
        ComponentConfig::encode(Self::KIND, &self.settings)
    }
}

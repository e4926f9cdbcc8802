//! [`Orchestrator`]: owns the component graph and drives it.
//!
//! One control thread owns the orchestrator and calls its `&mut self`
//! methods. Other threads only ever hold a [`ChangeSender`] and enqueue
//! registrations, which are applied at the next synchronization point:
//! `attach`, `detach`, `save`, the start of each update phase, or an
//! explicit [`apply_pending_changes`](Orchestrator::apply_pending_changes).

use std::mem;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use gantry_core::{
    change_channel, AttachContext, CapabilityId, CapabilitySet, ChangeSender, Component,
    ComponentConfig, ComponentError, EntryId, EntryIdAllocator, Factory, PendingChange, Phase,
};
use gantry_graph::{EntryGraph, EntryProfile, FactoryId, GraphError, RuntimeEntry};
use log::{debug, error, info, trace, warn};

use crate::config::{validate_profiling_window, ConfigError, OrchestratorConfig};
use crate::event::{EventBus, LifecycleEvent};
use crate::guard::isolate;
use crate::metrics::{Fault, Hook, PhaseMetrics};
use crate::pending::PendingQueue;
use crate::registry::KindRegistry;
use crate::schedule::{RoundRobin, Tick};
use crate::session::SessionConfig;

/// Whether components have been attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachState {
    /// Components are registered but not running.
    Unattached,
    /// Components have been attached and receive updates.
    Attached,
}

/// Resolves component dependencies and drives attach, update and detach.
///
/// # Examples
///
/// ```
/// use gantry_core::{CapabilityId, CapabilitySet, Component};
/// use gantry_engine::{Orchestrator, OrchestratorConfig};
///
/// const NET: CapabilityId = CapabilityId::from_static("net");
///
/// struct Network;
/// impl Component for Network {
///     fn kind(&self) -> &str { "network" }
///     fn supplies(&self) -> CapabilitySet { [NET].into_iter().collect() }
/// }
///
/// struct Chat;
/// impl Component for Chat {
///     fn kind(&self) -> &str { "chat" }
///     fn dependencies(&self) -> CapabilitySet { [NET].into_iter().collect() }
/// }
///
/// let mut orch = Orchestrator::new(OrchestratorConfig::default()).unwrap();
/// let chat = orch.register(Chat);
/// let net = orch.register(Network);
/// orch.attach().unwrap();
/// assert_eq!(orch.ordered_entries(), &[net, chat]);
///
/// let metrics = orch.update_before().unwrap();
/// assert!(metrics.faults.is_empty());
/// orch.detach().unwrap();
/// ```
pub struct Orchestrator {
    graph: EntryGraph,
    order: Vec<EntryId>,
    pending: PendingQueue,
    changes: ChangeSender,
    state: AttachState,
    config: OrchestratorConfig,
    round_robin: [RoundRobin; 2],
    events: EventBus,
    faults: Vec<Fault>,
}

impl Orchestrator {
    /// Create an empty, unattached orchestrator.
    pub fn new(config: OrchestratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: OrchestratorConfig) -> Self {
        let ids = EntryIdAllocator::new();
        let (changes, rx) = change_channel(ids.clone());
        let mut graph = EntryGraph::new(ids);
        graph.set_profiling_window(config.profiling_average_length);
        Self {
            graph,
            order: Vec::new(),
            pending: PendingQueue::new(rx),
            changes,
            state: AttachState::Unattached,
            config,
            round_robin: [RoundRobin::new(), RoundRobin::new()],
            events: EventBus::default(),
            faults: Vec::new(),
        }
    }

    // ── Registration ────────────────────────────────────────────

    /// A cloneable, thread-safe handle for queueing registrations.
    pub fn changes(&self) -> ChangeSender {
        self.changes.clone()
    }

    /// Queue `component` for registration. Takes effect at the next
    /// synchronization point.
    pub fn register<C: Component>(&self, component: C) -> EntryId {
        self.changes.register(Box::new(component))
    }

    /// Queue `component` together with a configuration blob that is loaded
    /// just before the component is attached.
    pub fn register_with_config<C: Component>(
        &self,
        component: C,
        config: ComponentConfig,
    ) -> EntryId {
        self.changes.register_with_config(Box::new(component), config)
    }

    /// Queue removal of an entry.
    pub fn unregister(&self, entry: EntryId) {
        self.changes.unregister(entry);
    }

    /// Number of changes waiting for the next synchronization point.
    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    /// Register a factory used to instantiate a provider for any of
    /// `capabilities` when one is required but missing.
    pub fn register_factory(
        &mut self,
        capabilities: impl IntoIterator<Item = CapabilityId>,
        factory: Factory,
    ) -> Result<FactoryId, GraphError> {
        let capabilities: CapabilitySet = capabilities.into_iter().collect();
        self.graph.register_factory(&capabilities, factory)
    }

    /// Remove a factory. Returns `false` if it was unknown.
    pub fn unregister_factory(&mut self, id: FactoryId) -> bool {
        self.graph.unregister_factory(id)
    }

    // ── Synchronization ─────────────────────────────────────────

    /// Apply every change queued before this call.
    ///
    /// Changes are applied in submission order. The first one that fails
    /// is consumed and its error returned; changes after it stay queued.
    /// While attached, the order is rebuilt and newly added entries
    /// (including any a factory had to create) are attached before this
    /// returns. Returns the number of changes applied.
    pub fn apply_pending_changes(&mut self) -> Result<usize, GraphError> {
        let mut applied = 0;
        let mut added = Vec::new();
        let mut failure = None;

        for change in self.pending.drain() {
            let result = match change {
                PendingChange::Add {
                    entry,
                    component,
                    config,
                } => self.graph.insert(entry, component, config).map(|()| {
                    added.push(entry);
                    true
                }),
                PendingChange::Remove { entry } => self.remove_entry(entry, &mut added),
            };
            match result {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("rejected pending change: {e}");
                    failure = Some(e);
                    break;
                }
            }
        }

        let committed = if self.state == AttachState::Attached && applied > 0 {
            self.commit_attached(&added)
        } else {
            Ok(())
        };
        match (failure, committed) {
            (Some(e), Err(rollback)) => {
                error!("rebuild after rejected change also failed: {rollback}");
                Err(e)
            }
            (Some(e), Ok(())) | (None, Err(e)) => Err(e),
            (None, Ok(())) => Ok(applied),
        }
    }

    /// Remove `entry`. An entry added earlier in the same batch was never
    /// attached, so it is dropped from `added` instead of being detached.
    fn remove_entry(
        &mut self,
        entry: EntryId,
        added: &mut Vec<EntryId>,
    ) -> Result<bool, GraphError> {
        let Some(mut removed) = self.graph.remove(entry)? else {
            warn!("unregister of unknown entry {entry}");
            return Ok(false);
        };
        self.order.retain(|id| *id != entry);
        debug!("removed '{}' (entry {entry})", removed.kind());
        let unattached = added.contains(&entry);
        added.retain(|id| *id != entry);
        if self.state == AttachState::Attached && !unattached {
            self.detach_one(&mut removed);
        }
        Ok(true)
    }

    /// Rebuild after changes were applied while attached, then attach
    /// whatever is new.
    fn commit_attached(&mut self, added: &[EntryId]) -> Result<(), GraphError> {
        match self.graph.rebuild() {
            Ok(rebuild) => {
                self.order = rebuild.order;
                let fresh: Vec<EntryId> = self
                    .order
                    .iter()
                    .copied()
                    .filter(|id| added.contains(id) || rebuild.created.contains(id))
                    .collect();
                self.attach_entries(&fresh);
                Ok(())
            }
            Err(e) => {
                error!("rebuild failed, rolling back {} new entries: {e}", added.len());
                self.graph.discard(added);
                match self.graph.rebuild() {
                    Ok(rebuild) => self.order = rebuild.order,
                    Err(again) => error!("rebuild after rollback failed: {again}"),
                }
                Err(e)
            }
        }
    }

    /// Resolve the graph and attach every entry in dependency order.
    ///
    /// A no-op while already attached. On a structural error the
    /// orchestrator stays unattached and nothing is attached. Returns the
    /// faults isolated while attaching (and any left over from earlier
    /// synchronization points).
    pub fn attach(&mut self) -> Result<Vec<Fault>, GraphError> {
        if self.state == AttachState::Attached {
            return Ok(Vec::new());
        }
        self.apply_pending_changes()?;
        let rebuild = self.graph.rebuild()?;
        self.order = rebuild.order;
        self.state = AttachState::Attached;
        info!("attaching {} components", self.order.len());

        let order = self.order.clone();
        self.attach_entries(&order);
        // Pick up anything registered from inside `on_attach`.
        self.apply_pending_changes()?;
        Ok(mem::take(&mut self.faults))
    }

    /// Detach every entry in reverse dependency order.
    ///
    /// A no-op while unattached. Entries stay registered and are attached
    /// again by the next [`attach`](Self::attach).
    pub fn detach(&mut self) -> Result<Vec<Fault>, GraphError> {
        if self.state == AttachState::Unattached {
            return Ok(Vec::new());
        }
        self.apply_pending_changes()?;
        info!("detaching {} components", self.order.len());
        for id in self.order.clone().into_iter().rev() {
            if let Some(entry) = self.graph.entry_mut(id) {
                Self::run_detach(entry, &mut self.faults, &mut self.events);
            }
        }
        self.state = AttachState::Unattached;
        Ok(mem::take(&mut self.faults))
    }

    /// Call every entry's `save` hook in order. Only runs while attached.
    pub fn save(&mut self) -> Result<Vec<Fault>, GraphError> {
        if self.state == AttachState::Unattached {
            return Ok(Vec::new());
        }
        self.apply_pending_changes()?;
        for &id in &self.order {
            if let Some(entry) = self.graph.entry_mut(id) {
                let result = isolate(|| entry.component_mut().save());
                if let Err(error) = result {
                    self.faults.push(fault(entry, Hook::Save, error));
                }
            }
        }
        Ok(mem::take(&mut self.faults))
    }

    /// Faults isolated outside an update phase that have not been
    /// reported yet.
    pub fn take_faults(&mut self) -> Vec<Fault> {
        mem::take(&mut self.faults)
    }

    fn attach_entries(&mut self, ids: &[EntryId]) {
        // One provider snapshot per batch; every provider in it is
        // already part of the graph.
        let providers = self.graph.provider_table();
        let lag = self.config.tolerable_lag;
        for &id in ids {
            let Some(entry) = self.graph.entry_mut(id) else {
                continue;
            };

            if let Err(error) = isolate(|| {
                entry.inject_providers(&providers);
                Ok(())
            }) {
                self.faults.push(fault(entry, Hook::Attach, error));
            }
            if let Some(Err(error)) = isolate(|| Ok(entry.load_persisted_config()))
                .unwrap_or_else(|panic| Some(Err(panic)))
            {
                self.faults.push(fault(entry, Hook::LoadConfiguration, error));
            }

            let ctx = AttachContext::new(id, &self.changes, &providers, lag);
            if let Err(error) = isolate(|| entry.component_mut().on_attach(&ctx)) {
                self.faults.push(fault(entry, Hook::Attach, error));
            }

            debug!("attached '{}' (entry {id})", entry.kind());
            self.events.emit(LifecycleEvent::Attached {
                entry: id,
                kind: entry.kind().to_owned(),
            });
        }
    }

    fn detach_one(&mut self, entry: &mut RuntimeEntry) {
        Self::run_detach(entry, &mut self.faults, &mut self.events);
    }

    fn run_detach(entry: &mut RuntimeEntry, faults: &mut Vec<Fault>, events: &mut EventBus) {
        if let Err(error) = isolate(|| entry.component_mut().on_detach()) {
            faults.push(fault(entry, Hook::Detach, error));
        }
        debug!("detached '{}' (entry {})", entry.kind(), entry.id());
        events.emit(LifecycleEvent::Detached {
            entry: entry.id(),
            kind: entry.kind().to_owned(),
        });
    }

    // ── Update phases ───────────────────────────────────────────

    /// Run the phase before the external simulation step.
    pub fn update_before(&mut self) -> Result<PhaseMetrics, GraphError> {
        self.run_phase(Phase::Before)
    }

    /// Run the phase after the external simulation step.
    pub fn update_after(&mut self) -> Result<PhaseMetrics, GraphError> {
        self.run_phase(Phase::After)
    }

    /// Apply pending changes, run the full update pass, then spend the
    /// rest of the budget on round-robin ticks.
    ///
    /// An entry whose hook fails or panics is reported in
    /// [`PhaseMetrics::faults`] and skipped for the rest of the phase.
    fn run_phase(&mut self, phase: Phase) -> Result<PhaseMetrics, GraphError> {
        let phase_start = Instant::now();
        let mut metrics = PhaseMetrics::new(phase);
        metrics.changes_applied = self.apply_pending_changes()?;
        let mut faults = mem::take(&mut self.faults);

        if self.state == AttachState::Unattached {
            metrics.faults = faults;
            metrics.total_us = micros(phase_start.elapsed());
            return Ok(metrics);
        }

        // Full pass.
        let update_start = Instant::now();
        let mut skipped = vec![false; self.order.len()];
        for (pos, &id) in self.order.iter().enumerate() {
            let Some(entry) = self.graph.entry_mut(id) else {
                continue;
            };
            let t = Instant::now();
            let result = isolate(|| phase.update(entry.component_mut()));
            entry.profile_mut().phase_mut(phase).record_update(t.elapsed());
            if let Err(error) = result {
                skipped[pos] = true;
                faults.push(fault(entry, Hook::Update, error));
            }
        }
        metrics.update_us = micros(update_start.elapsed());

        // Round-robin continuation.
        let rr_start = Instant::now();
        let order = &self.order;
        let graph = &mut self.graph;
        let outcome = self.round_robin[phase.index()].run(
            order.len(),
            self.config.tolerable_lag,
            || phase_start.elapsed(),
            |pos| {
                if skipped[pos] {
                    return Tick::Skipped;
                }
                let Some(entry) = order.get(pos).and_then(|id| graph.entry_mut(*id)) else {
                    return Tick::Skipped;
                };
                let t = Instant::now();
                let result = isolate(|| phase.tick_round_robin(entry.component_mut()));
                entry
                    .profile_mut()
                    .phase_mut(phase)
                    .record_round_robin_tick(t.elapsed());
                match result {
                    Ok(true) => Tick::Worked,
                    Ok(false) => Tick::Idle,
                    Err(error) => {
                        skipped[pos] = true;
                        faults.push(fault(entry, Hook::RoundRobin, error));
                        Tick::Idle
                    }
                }
            },
        );
        metrics.round_robin_us = micros(rr_start.elapsed());
        metrics.round_robin_ticks = outcome.ticks;
        metrics.round_robin_productive = outcome.productive;

        for &id in &self.order {
            if let Some(entry) = self.graph.entry_mut(id) {
                entry.profile_mut().phase_mut(phase).commit_round_robin();
            }
        }

        metrics.faults = faults;
        metrics.total_us = micros(phase_start.elapsed());
        trace!(
            "{phase:?} phase: {} entries, update {}us, round-robin {} ticks ({} productive) in {}us, {} faults",
            self.order.len(),
            metrics.update_us,
            metrics.round_robin_ticks,
            metrics.round_robin_productive,
            metrics.round_robin_us,
            metrics.faults.len(),
        );
        Ok(metrics)
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Collect the blobs of every component that opts into persistence,
    /// in registration order.
    pub fn save_configuration(&self) -> Result<SessionConfig, ConfigError> {
        let mut components = Vec::new();
        for entry in self.graph.iter() {
            let component = entry.component();
            if !component.save_to_storage() {
                continue;
            }
            let blob = isolate(|| component.save_configuration()).map_err(|error| {
                ConfigError::Component {
                    kind: entry.kind().to_owned(),
                    error,
                }
            })?;
            components.push(blob);
        }
        Ok(SessionConfig {
            tolerable_lag_secs: self.config.tolerable_lag.as_secs_f64(),
            components,
        })
    }

    /// Adopt a saved session: set the tolerable lag and queue one
    /// registration per blob.
    ///
    /// Every blob is instantiated through `registry` before anything is
    /// queued, so an unknown kind leaves the orchestrator untouched.
    pub fn append_configuration(
        &mut self,
        session: &SessionConfig,
        registry: &KindRegistry,
    ) -> Result<Vec<EntryId>, ConfigError> {
        let lag = session.tolerable_lag()?;
        let instances = session
            .components
            .iter()
            .map(|blob| Ok((registry.instantiate(blob)?, blob.clone())))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        self.set_tolerable_lag(lag);
        debug!("appending {} components from session", instances.len());
        Ok(instances
            .into_iter()
            .map(|(component, blob)| self.changes.register_with_config(component, blob))
            .collect())
    }

    /// Adopt a saved session and apply it right away.
    ///
    /// Like [`append_configuration`](Self::append_configuration), then runs
    /// a synchronization point so structural problems in the session (two
    /// blobs supplying one capability, say) surface here as
    /// [`ConfigError::Graph`]. While attached, the new components are
    /// attached before this returns.
    pub fn load_configuration(
        &mut self,
        session: &SessionConfig,
        registry: &KindRegistry,
    ) -> Result<Vec<EntryId>, ConfigError> {
        let ids = self.append_configuration(session, registry)?;
        self.apply_pending_changes()?;
        Ok(ids)
    }

    // ── Settings ────────────────────────────────────────────────

    /// Current round-robin budget.
    pub fn tolerable_lag(&self) -> Duration {
        self.config.tolerable_lag
    }

    /// Change the round-robin budget. Zero disables round-robin ticks.
    pub fn set_tolerable_lag(&mut self, lag: Duration) {
        self.config.tolerable_lag = lag;
    }

    /// Current moving-average window length.
    pub fn profiling_average_length(&self) -> usize {
        self.config.profiling_average_length
    }

    /// Resize every entry's moving averages. Zero disables profiling.
    pub fn set_profiling_average_length(&mut self, length: usize) -> Result<(), ConfigError> {
        validate_profiling_window(length)?;
        self.config.profiling_average_length = length;
        self.graph.set_profiling_window(length);
        Ok(())
    }

    /// Subscribe to attach and detach notifications.
    pub fn subscribe(&mut self) -> Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    // ── Lookup ──────────────────────────────────────────────────

    /// Attach state.
    pub fn state(&self) -> AttachState {
        self.state
    }

    /// Whether components are attached.
    pub fn is_attached(&self) -> bool {
        self.state == AttachState::Attached
    }

    /// Entries in dependency order, as of the last rebuild.
    pub fn ordered_entries(&self) -> &[EntryId] {
        &self.order
    }

    /// Number of registered entries, including ones not yet attached.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Whether no entry is registered.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Whether `entry` is registered.
    pub fn contains(&self, entry: EntryId) -> bool {
        self.graph.contains(entry)
    }

    /// The component registered as `entry`.
    pub fn component(&self, entry: EntryId) -> Option<&dyn Component> {
        self.graph.entry(entry).map(RuntimeEntry::component)
    }

    /// The component registered as `entry`, mutably.
    pub fn component_mut(&mut self, entry: EntryId) -> Option<&mut dyn Component> {
        self.graph.entry_mut(entry).map(RuntimeEntry::component_mut)
    }

    /// Every entry of the given kind, in registration order.
    pub fn entries_of_kind(&self, kind: &str) -> Vec<EntryId> {
        self.graph.entries_of_kind(kind).collect()
    }

    /// Entry currently supplying `capability`.
    pub fn provider(&self, capability: &CapabilityId) -> Option<EntryId> {
        self.graph.provider(capability).map(RuntimeEntry::id)
    }

    /// Timing statistics of `entry`.
    pub fn profile(&self, entry: EntryId) -> Option<&EntryProfile> {
        self.graph.entry(entry).map(RuntimeEntry::profile)
    }

    /// Position the next round-robin scan of `phase` starts from.
    pub fn round_robin_cursor(&self, phase: Phase) -> usize {
        self.round_robin[phase.index()].cursor()
    }

    /// The underlying graph.
    pub fn graph(&self) -> &EntryGraph {
        &self.graph
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::build(OrchestratorConfig::default())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("entries", &self.graph.len())
            .field("pending", &self.pending.len())
            .field("config", &self.config)
            .finish()
    }
}

fn fault(entry: &RuntimeEntry, hook: Hook, error: ComponentError) -> Fault {
    let fault = Fault {
        entry: entry.id(),
        kind: entry.kind().to_owned(),
        hook,
        error,
    };
    match fault.error {
        ComponentError::Panicked { .. } => warn!("contained panic: {fault}"),
        _ => error!("component fault: {fault}"),
    }
    fault
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

//! [`RuntimeEntry`]: one component instance inside the active graph.

use std::fmt;
use std::sync::Arc;

use gantry_core::{
    CapabilitySet, Component, ComponentConfig, ComponentError, EntryId, Provider, ProviderTable,
};
use smallvec::SmallVec;

use crate::profile::EntryProfile;

/// Edge list type; most entries have only a handful of neighbours.
pub type EntryList = SmallVec<[EntryId; 4]>;

/// A component plus everything the graph knows about it.
///
/// The component's declarations (`kind`, `dependencies`, `supplies`,
/// `priority`) are read once, at construction. Dependency edges are
/// filled in by the graph's link step and are always duplicate-free.
pub struct RuntimeEntry {
    id: EntryId,
    kind: Arc<str>,
    component: Box<dyn Component>,
    config: Option<ComponentConfig>,
    requires: CapabilitySet,
    supplies: CapabilitySet,
    priority: i32,
    lazy: bool,
    pub(crate) dependencies: EntryList,
    pub(crate) dependents: EntryList,
    pub(crate) unsolved: usize,
    profile: EntryProfile,
}

impl RuntimeEntry {
    /// Wrap `component`, caching its declarations.
    pub fn new(
        id: EntryId,
        component: Box<dyn Component>,
        config: Option<ComponentConfig>,
        profiling_window: usize,
    ) -> Self {
        Self {
            id,
            kind: Arc::from(component.kind()),
            requires: component.dependencies(),
            supplies: component.supplies(),
            priority: component.priority(),
            component,
            config,
            lazy: false,
            dependencies: EntryList::new(),
            dependents: EntryList::new(),
            unsolved: 0,
            profile: EntryProfile::new(profiling_window),
        }
    }

    pub(crate) fn mark_lazy(&mut self) {
        self.lazy = true;
    }

    /// Entry id.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Component kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Capabilities the component requires.
    pub fn requires(&self) -> &CapabilitySet {
        &self.requires
    }

    /// Capabilities the component supplies.
    pub fn supplies(&self) -> &CapabilitySet {
        &self.supplies
    }

    /// Tie-break priority; lower runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the entry was created by a factory rather than registered.
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Entries this one depends on, in declared order.
    pub fn dependencies(&self) -> &[EntryId] {
        &self.dependencies
    }

    /// Entries depending on this one.
    pub fn dependents(&self) -> &[EntryId] {
        &self.dependents
    }

    /// Dependencies not yet placed by the last sort that touched this entry.
    pub fn unsolved(&self) -> usize {
        self.unsolved
    }

    /// Persisted configuration attached at registration, if any.
    pub fn config(&self) -> Option<&ComponentConfig> {
        self.config.as_ref()
    }

    /// The component.
    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    /// The component, mutably.
    pub fn component_mut(&mut self) -> &mut dyn Component {
        self.component.as_mut()
    }

    /// Timing statistics.
    pub fn profile(&self) -> &EntryProfile {
        &self.profile
    }

    /// Timing statistics, mutably.
    pub fn profile_mut(&mut self) -> &mut EntryProfile {
        &mut self.profile
    }

    /// The handle dependents receive for this entry.
    pub fn provider(&self) -> Provider {
        Provider::new(self.id, Arc::clone(&self.kind), self.component.service())
    }

    /// Call `on_dependency_satisfied` once for every required capability
    /// that has a provider in `table`. Returns how many were injected.
    pub fn inject_providers(&mut self, table: &ProviderTable) -> usize {
        let mut injected = 0;
        for capability in &self.requires {
            if let Some(provider) = table.get(capability) {
                self.component.on_dependency_satisfied(capability, provider);
                injected += 1;
            }
        }
        injected
    }

    /// Apply the persisted configuration, if the entry has one.
    pub fn load_persisted_config(&mut self) -> Option<Result<(), ComponentError>> {
        let config = self.config.as_ref()?;
        Some(self.component.load_configuration(config))
    }

    /// Consume the entry and return its component.
    pub fn into_component(self) -> Box<dyn Component> {
        self.component
    }
}

impl fmt::Debug for RuntimeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeEntry")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("lazy", &self.lazy)
            .field("dependencies", &self.dependencies)
            .field("dependents", &self.dependents)
            .finish()
    }
}

//! [`EntryGraph`]: the set of runtime entries and their dependency edges.

use gantry_core::{
    CapabilityId, CapabilitySet, Component, ComponentConfig, EntryId, EntryIdAllocator, Factory,
    ProviderTable,
};
use indexmap::IndexMap;
use log::{debug, error};

use crate::capability::CapabilityMap;
use crate::entry::{EntryList, RuntimeEntry};
use crate::error::GraphError;
use crate::factory::{FactoryId, FactoryRegistry};
use crate::sort::sort_entries;

/// Result of a successful [`EntryGraph::rebuild`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rebuild {
    /// Every entry, dependencies first.
    pub order: Vec<EntryId>,
    /// Entries instantiated by factories during this rebuild, in creation order.
    pub created: Vec<EntryId>,
}

/// Owns every runtime entry, the capability map, and the factory registry.
///
/// Mutation is split in two steps. [`insert`](Self::insert) and
/// [`remove`](Self::remove) change membership and capability ownership
/// only; [`rebuild`](Self::rebuild) then instantiates missing providers,
/// recomputes edges, and produces a fresh topological order.
pub struct EntryGraph {
    entries: IndexMap<EntryId, RuntimeEntry>,
    capabilities: CapabilityMap,
    factories: FactoryRegistry,
    ids: EntryIdAllocator,
    profiling_window: usize,
}

impl EntryGraph {
    /// Create an empty graph. Lazily instantiated entries draw ids from `ids`.
    pub fn new(ids: EntryIdAllocator) -> Self {
        Self {
            entries: IndexMap::new(),
            capabilities: CapabilityMap::new(),
            factories: FactoryRegistry::new(),
            ids,
            profiling_window: 0,
        }
    }

    // ── Membership ──────────────────────────────────────────────

    /// Add a component under `id` and claim its capabilities.
    ///
    /// Fails with [`GraphError::DuplicateCapability`] if any supplied
    /// capability is already owned; the graph is then unchanged.
    pub fn insert(
        &mut self,
        id: EntryId,
        component: Box<dyn Component>,
        config: Option<ComponentConfig>,
    ) -> Result<(), GraphError> {
        let entry = RuntimeEntry::new(id, component, config, self.profiling_window);
        self.claim(&entry)?;
        debug!("inserted '{}' as entry {id}", entry.kind());
        self.entries.insert(id, entry);
        Ok(())
    }

    /// Remove an entry that nothing depends on.
    ///
    /// Returns `Ok(None)` if `id` is unknown. Fails with
    /// [`GraphError::RemovalWithDependents`] if another entry requires a
    /// capability it supplies; the graph is then unchanged.
    pub fn remove(&mut self, id: EntryId) -> Result<Option<RuntimeEntry>, GraphError> {
        let Some(entry) = self.entries.get(&id) else {
            return Ok(None);
        };
        let dependents = self.live_dependents(id);
        if !dependents.is_empty() {
            let kinds: Vec<String> = dependents
                .iter()
                .filter_map(|d| self.entries.get(d))
                .map(|d| d.kind().to_owned())
                .collect();
            error!(
                "cannot remove '{}' (entry {id}): required by {}",
                entry.kind(),
                kinds.join(", ")
            );
            return Err(GraphError::RemovalWithDependents {
                entry: id,
                kind: entry.kind().to_owned(),
                dependents: kinds,
            });
        }
        Ok(self.detach_entry(id))
    }

    /// Remove entries unconditionally, dropping their components.
    ///
    /// Used to roll back entries whose insertion could not be completed.
    pub fn discard(&mut self, ids: &[EntryId]) {
        for &id in ids.iter().rev() {
            if self.detach_entry(id).is_some() {
                debug!("discarded entry {id}");
            }
        }
    }

    /// Entries (other than `id`) requiring a capability `id` owns.
    fn live_dependents(&self, id: EntryId) -> EntryList {
        self.entries
            .values()
            .filter(|e| e.id() != id)
            .filter(|e| {
                e.requires()
                    .iter()
                    .any(|c| self.capabilities.owner(c) == Some(id))
            })
            .map(RuntimeEntry::id)
            .collect()
    }

    fn detach_entry(&mut self, id: EntryId) -> Option<RuntimeEntry> {
        let entry = self.entries.shift_remove(&id)?;
        self.capabilities.release(id, entry.supplies());
        for neighbour in entry.dependencies().iter().chain(entry.dependents()) {
            if let Some(n) = self.entries.get_mut(neighbour) {
                n.dependencies.retain(|d| *d != id);
                n.dependents.retain(|d| *d != id);
            }
        }
        Some(entry)
    }

    fn claim(&mut self, entry: &RuntimeEntry) -> Result<(), GraphError> {
        self.capabilities
            .claim(entry.id(), entry.supplies())
            .map_err(|conflict| GraphError::DuplicateCapability {
                existing: self
                    .entries
                    .get(&conflict.owner)
                    .map(|e| e.kind().to_owned())
                    .unwrap_or_default(),
                capability: conflict.capability,
                incoming: entry.kind().to_owned(),
            })
    }

    // ── Resolution ──────────────────────────────────────────────

    /// Instantiate missing providers, relink, and re-sort.
    ///
    /// On failure every entry this call instantiated is discarded again
    /// and the error is returned; explicitly inserted entries stay.
    pub fn rebuild(&mut self) -> Result<Rebuild, GraphError> {
        let mut created = Vec::new();
        let result = self
            .resolve_lazy(&mut created)
            .and_then(|()| self.link())
            .and_then(|()| sort_entries(&mut self.entries));
        match result {
            Ok(order) => Ok(Rebuild { order, created }),
            Err(e) => {
                self.discard(&created);
                Err(e)
            }
        }
    }

    /// Walk every entry's dependencies in declared order and instantiate
    /// a provider for each capability that has no owner, depth-first.
    fn resolve_lazy(&mut self, created: &mut Vec<EntryId>) -> Result<(), GraphError> {
        let roots: Vec<EntryId> = self.entries.keys().copied().collect();
        for id in roots {
            self.resolve_entry(id, created)?;
        }
        Ok(())
    }

    fn resolve_entry(&mut self, id: EntryId, created: &mut Vec<EntryId>) -> Result<(), GraphError> {
        let Some(entry) = self.entries.get(&id) else {
            return Ok(());
        };
        let requires = entry.requires().clone();
        let required_by = entry.kind().to_owned();

        for capability in &requires {
            if self.capabilities.owner(capability).is_some() {
                continue;
            }
            let Some(factory) = self.factories.get(capability).cloned() else {
                return Err(GraphError::UnresolvedDependency {
                    capability: capability.clone(),
                    required_by,
                });
            };
            let component = factory();
            if !component.supplies().contains(capability) {
                return Err(GraphError::FactoryMismatch {
                    capability: capability.clone(),
                    produced: component.kind().to_owned(),
                });
            }

            let new_id = self.ids.next_id();
            let mut lazy = RuntimeEntry::new(new_id, component, None, self.profiling_window);
            lazy.mark_lazy();
            self.claim(&lazy)?;
            debug!(
                "instantiated '{}' as entry {new_id} to supply '{capability}' for '{required_by}'",
                lazy.kind()
            );
            self.entries.insert(new_id, lazy);
            created.push(new_id);

            self.resolve_entry(new_id, created)?;
        }
        Ok(())
    }

    /// Recompute dependency and dependent edges from capability ownership.
    fn link(&mut self) -> Result<(), GraphError> {
        let mut edges = Vec::new();
        for entry in self.entries.values() {
            for capability in entry.requires() {
                let owner = self.capabilities.owner(capability).ok_or_else(|| {
                    GraphError::UnresolvedDependency {
                        capability: capability.clone(),
                        required_by: entry.kind().to_owned(),
                    }
                })?;
                edges.push((entry.id(), owner));
            }
        }

        for entry in self.entries.values_mut() {
            entry.dependencies.clear();
            entry.dependents.clear();
        }
        for (dependent, dependency) in edges {
            if let Some(e) = self.entries.get_mut(&dependent) {
                if !e.dependencies.contains(&dependency) {
                    e.dependencies.push(dependency);
                }
            }
            if let Some(e) = self.entries.get_mut(&dependency) {
                if !e.dependents.contains(&dependent) {
                    e.dependents.push(dependent);
                }
            }
        }
        Ok(())
    }

    // ── Factories ───────────────────────────────────────────────

    /// Register a factory for every capability in `capabilities`.
    pub fn register_factory(
        &mut self,
        capabilities: &CapabilitySet,
        factory: Factory,
    ) -> Result<FactoryId, GraphError> {
        self.factories.register(capabilities, factory)
    }

    /// Remove a factory. Returns `false` if it was unknown.
    pub fn unregister_factory(&mut self, id: FactoryId) -> bool {
        self.factories.unregister(id)
    }

    /// The factory registry.
    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    // ── Lookup ──────────────────────────────────────────────────

    /// Handles for every owned capability, for injection into dependents.
    pub fn provider_table(&self) -> ProviderTable {
        let mut table = ProviderTable::new();
        for (capability, owner) in self.capabilities.iter() {
            if let Some(entry) = self.entries.get(&owner) {
                table.insert(capability.clone(), entry.provider());
            }
        }
        table
    }

    /// Entry currently supplying `capability`.
    pub fn provider(&self, capability: &CapabilityId) -> Option<&RuntimeEntry> {
        self.capabilities
            .owner(capability)
            .and_then(|id| self.entries.get(&id))
    }

    /// Look up an entry.
    pub fn entry(&self, id: EntryId) -> Option<&RuntimeEntry> {
        self.entries.get(&id)
    }

    /// Look up an entry mutably.
    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut RuntimeEntry> {
        self.entries.get_mut(&id)
    }

    /// Whether `id` is in the graph.
    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Ids of every entry of the given kind, in registration order.
    pub fn entries_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = EntryId> + 'a {
        self.entries
            .values()
            .filter(move |e| e.kind() == kind)
            .map(RuntimeEntry::id)
    }

    /// Every entry, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RuntimeEntry> {
        self.entries.values()
    }

    /// Every entry mutably, in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RuntimeEntry> {
        self.entries.values_mut()
    }

    /// Capability ownership.
    pub fn capabilities(&self) -> &CapabilityMap {
        &self.capabilities
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the graph has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Profiling ───────────────────────────────────────────────

    /// Moving-average window applied to every entry (0 disables).
    pub fn profiling_window(&self) -> usize {
        self.profiling_window
    }

    /// Resize every entry's moving averages.
    pub fn set_profiling_window(&mut self, window: usize) {
        self.profiling_window = window;
        for entry in self.entries.values_mut() {
            entry.profile_mut().resize(window);
        }
    }
}

impl std::fmt::Debug for EntryGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryGraph")
            .field("entries", &self.entries.len())
            .field("capabilities", &self.capabilities.len())
            .field("factories", &self.factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_test_utils::{cap, factory, EventLog, RecordingComponent};

    fn graph() -> EntryGraph {
        EntryGraph::new(EntryIdAllocator::new())
    }

    fn rec(name: &'static str, log: &EventLog) -> RecordingComponent {
        RecordingComponent::new(name, log)
    }

    fn kinds(g: &EntryGraph, order: &[EntryId]) -> Vec<String> {
        order
            .iter()
            .map(|id| g.entry(*id).unwrap().kind().to_owned())
            .collect()
    }

    fn set(names: &[&'static str]) -> CapabilitySet {
        names.iter().map(|n| cap(n)).collect()
    }

    #[test]
    fn duplicate_capability_leaves_first_owner() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(EntryId(1), Box::new(rec("net_a", &log).supplies(cap("net"))), None)
            .unwrap();
        let err = g
            .insert(EntryId(2), Box::new(rec("net_b", &log).supplies(cap("net"))), None)
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateCapability {
                capability: cap("net"),
                existing: "net_a".into(),
                incoming: "net_b".into(),
            }
        );
        assert_eq!(g.len(), 1);
        assert_eq!(g.provider(&cap("net")).map(RuntimeEntry::id), Some(EntryId(1)));
    }

    #[test]
    fn rebuild_orders_and_links() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(EntryId(1), Box::new(rec("chat", &log).requires(cap("net"))), None)
            .unwrap();
        g.insert(EntryId(2), Box::new(rec("net", &log).supplies(cap("net"))), None)
            .unwrap();
        let rebuild = g.rebuild().unwrap();
        assert_eq!(kinds(&g, &rebuild.order), vec!["net", "chat"]);
        assert!(rebuild.created.is_empty());
        assert_eq!(g.entry(EntryId(1)).unwrap().dependencies(), &[EntryId(2)]);
        assert_eq!(g.entry(EntryId(2)).unwrap().dependents(), &[EntryId(1)]);
    }

    #[test]
    fn repeated_requirement_links_once() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(
            EntryId(1),
            Box::new(rec("net", &log).supplies(cap("tcp")).supplies(cap("udp"))),
            None,
        )
        .unwrap();
        g.insert(
            EntryId(2),
            Box::new(rec("chat", &log).requires(cap("tcp")).requires(cap("udp"))),
            None,
        )
        .unwrap();
        g.rebuild().unwrap();
        assert_eq!(g.entry(EntryId(2)).unwrap().dependencies(), &[EntryId(1)]);
        assert_eq!(g.entry(EntryId(1)).unwrap().dependents(), &[EntryId(2)]);
    }

    #[test]
    fn removal_with_dependents_is_rejected() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(EntryId(1), Box::new(rec("net", &log).supplies(cap("net"))), None)
            .unwrap();
        g.insert(EntryId(2), Box::new(rec("chat", &log).requires(cap("net"))), None)
            .unwrap();
        let err = g.remove(EntryId(1)).unwrap_err();
        assert_eq!(
            err,
            GraphError::RemovalWithDependents {
                entry: EntryId(1),
                kind: "net".into(),
                dependents: vec!["chat".into()],
            }
        );
        assert_eq!(g.len(), 2);
        assert!(g.provider(&cap("net")).is_some());

        let chat = g.remove(EntryId(2)).unwrap().unwrap();
        assert_eq!(chat.kind(), "chat");
        assert!(g.remove(EntryId(1)).unwrap().is_some());
        assert!(g.capabilities().is_empty());
    }

    #[test]
    fn removing_unknown_entry_is_a_no_op() {
        let mut g = graph();
        assert!(g.remove(EntryId(99)).unwrap().is_none());
    }

    #[test]
    fn factory_instantiates_missing_provider_depth_first() {
        let log = EventLog::new();
        let mut g = graph();
        let flog = log.clone();
        g.register_factory(
            &set(&["net"]),
            factory(move || rec("net", &flog).supplies(cap("net")).requires(cap("socket"))),
        )
        .unwrap();
        let flog = log.clone();
        g.register_factory(
            &set(&["socket"]),
            factory(move || rec("socket", &flog).supplies(cap("socket"))),
        )
        .unwrap();

        g.insert(EntryId(100), Box::new(rec("chat", &log).requires(cap("net"))), None)
            .unwrap();
        let rebuild = g.rebuild().unwrap();
        assert_eq!(kinds(&g, &rebuild.created), vec!["net", "socket"]);
        assert_eq!(kinds(&g, &rebuild.order), vec!["socket", "net", "chat"]);
        assert!(rebuild
            .created
            .iter()
            .all(|id| g.entry(*id).unwrap().is_lazy()));
    }

    #[test]
    fn missing_provider_without_factory_is_unresolved() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(EntryId(1), Box::new(rec("chat", &log).requires(cap("net"))), None)
            .unwrap();
        assert_eq!(
            g.rebuild().unwrap_err(),
            GraphError::UnresolvedDependency {
                capability: cap("net"),
                required_by: "chat".into(),
            }
        );
    }

    #[test]
    fn factory_mismatch_is_reported() {
        let log = EventLog::new();
        let mut g = graph();
        let flog = log.clone();
        g.register_factory(&set(&["net"]), factory(move || rec("impostor", &flog)))
            .unwrap();
        g.insert(EntryId(1), Box::new(rec("chat", &log).requires(cap("net"))), None)
            .unwrap();
        assert_eq!(
            g.rebuild().unwrap_err(),
            GraphError::FactoryMismatch {
                capability: cap("net"),
                produced: "impostor".into(),
            }
        );
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn failed_rebuild_discards_lazy_entries() {
        let log = EventLog::new();
        let mut g = graph();
        let flog = log.clone();
        g.register_factory(
            &set(&["net"]),
            factory(move || rec("net", &flog).supplies(cap("net")).requires(cap("socket"))),
        )
        .unwrap();
        g.insert(EntryId(100), Box::new(rec("chat", &log).requires(cap("net"))), None)
            .unwrap();
        assert!(matches!(
            g.rebuild(),
            Err(GraphError::UnresolvedDependency { .. })
        ));
        assert_eq!(g.len(), 1);
        assert!(g.provider(&cap("net")).is_none());
    }

    #[test]
    fn provider_table_covers_owned_capabilities() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(
            EntryId(1),
            Box::new(rec("net", &log).supplies(cap("net")).with_service(5u8)),
            None,
        )
        .unwrap();
        let table = g.provider_table();
        let provider = table.get(&cap("net")).unwrap();
        assert_eq!(provider.kind(), "net");
        assert_eq!(*provider.service::<u8>().unwrap(), 5);
    }

    #[test]
    fn entries_of_kind_in_registration_order() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(EntryId(3), Box::new(rec("worker", &log)), None).unwrap();
        g.insert(EntryId(1), Box::new(rec("other", &log)), None).unwrap();
        g.insert(EntryId(2), Box::new(rec("worker", &log)), None).unwrap();
        let ids: Vec<EntryId> = g.entries_of_kind("worker").collect();
        assert_eq!(ids, vec![EntryId(3), EntryId(2)]);
    }

    #[test]
    fn profiling_window_applies_to_existing_entries() {
        let log = EventLog::new();
        let mut g = graph();
        g.insert(EntryId(1), Box::new(rec("a", &log)), None).unwrap();
        assert!(!g.entry(EntryId(1)).unwrap().profile().is_enabled());
        g.set_profiling_window(16);
        assert!(g.entry(EntryId(1)).unwrap().profile().is_enabled());
        g.insert(EntryId(2), Box::new(rec("b", &log)), None).unwrap();
        assert!(g.entry(EntryId(2)).unwrap().profile().is_enabled());
    }
}

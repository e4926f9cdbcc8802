//! Factories for on-demand instantiation of missing providers.

use std::fmt;

use gantry_core::{CapabilityId, CapabilitySet, Factory};
use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::GraphError;

/// Handle returned by [`FactoryRegistry::register`], used to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryId(pub u64);

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability → constructor.
///
/// A capability has at most one factory. The registry is only consulted
/// when a required capability has no current owner.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: IndexMap<CapabilityId, (FactoryId, Factory)>,
    next_id: u64,
}

impl FactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for every capability in `capabilities`.
    ///
    /// All-or-nothing: fails with [`GraphError::DuplicateFactory`] if any
    /// of them already has a factory.
    pub fn register(
        &mut self,
        capabilities: &CapabilitySet,
        factory: Factory,
    ) -> Result<FactoryId, GraphError> {
        if let Some(capability) = capabilities
            .iter()
            .find(|c| self.factories.contains_key(*c))
        {
            return Err(GraphError::DuplicateFactory {
                capability: capability.clone(),
            });
        }
        self.next_id += 1;
        let id = FactoryId(self.next_id);
        for capability in capabilities {
            self.factories
                .insert(capability.clone(), (id, factory.clone()));
        }
        debug!(
            "registered factory {id} for {} capabilities",
            capabilities.len()
        );
        Ok(id)
    }

    /// Remove every capability mapping of `id`.
    ///
    /// Returns `false` (and logs a warning) if `id` is unknown.
    pub fn unregister(&mut self, id: FactoryId) -> bool {
        let before = self.factories.len();
        self.factories.retain(|_, (owner, _)| *owner != id);
        if self.factories.len() == before {
            warn!("tried to unregister unknown factory {id}");
            return false;
        }
        true
    }

    /// Factory registered for `capability`.
    pub fn get(&self, capability: &CapabilityId) -> Option<&Factory> {
        self.factories.get(capability).map(|(_, f)| f)
    }

    /// Number of capabilities with a factory.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.factories.iter().map(|(c, (id, _))| (c, id)))
            .finish()
    }
}

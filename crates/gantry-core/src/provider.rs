//! Provider handles injected into dependent components.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::id::{CapabilityId, EntryId};

/// The component currently satisfying a capability, as seen by a dependent.
///
/// Components never get references into orchestrator state. Instead the
/// provider publishes a shared service object through
/// [`Component::service()`](crate::Component::service), and dependents
/// receive it wrapped in a `Provider` and downcast it to the concrete
/// type they expect.
#[derive(Clone)]
pub struct Provider {
    entry: EntryId,
    kind: Arc<str>,
    service: Option<Arc<dyn Any + Send + Sync>>,
}

impl Provider {
    /// Build a provider handle.
    pub fn new(
        entry: EntryId,
        kind: impl Into<Arc<str>>,
        service: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        Self {
            entry,
            kind: kind.into(),
            service,
        }
    }

    /// Entry id of the providing component.
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    /// Kind of the providing component.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the provider published a service object.
    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    /// Downcast the published service to `T`.
    ///
    /// Returns `None` if the provider published nothing or something of a
    /// different type.
    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.service.clone()?.downcast::<T>().ok()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("entry", &self.entry)
            .field("kind", &self.kind)
            .field("has_service", &self.service.is_some())
            .finish()
    }
}

/// Snapshot of capability → [`Provider`] taken before a batch of attaches.
#[derive(Clone, Debug, Default)]
pub struct ProviderTable {
    providers: IndexMap<CapabilityId, Provider>,
}

impl ProviderTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the provider for a capability, replacing any previous one.
    pub fn insert(&mut self, capability: CapabilityId, provider: Provider) {
        self.providers.insert(capability, provider);
    }

    /// Look up the provider of a capability.
    pub fn get(&self, capability: &CapabilityId) -> Option<&Provider> {
        self.providers.get(capability)
    }

    /// Number of capabilities with a provider.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterate `(capability, provider)` pairs in capability claim order.
    pub fn iter(&self) -> impl Iterator<Item = (&CapabilityId, &Provider)> {
        self.providers.iter()
    }
}

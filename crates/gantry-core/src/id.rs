//! Strongly-typed identifiers: [`CapabilityId`] and [`EntryId`].

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Names a contract a component can provide or require.
///
/// Capability ids are programmer-assigned strings, usually declared as
/// constants next to the component that supplies them:
///
/// ```
/// use gantry_core::CapabilityId;
///
/// const NETWORK: CapabilityId = CapabilityId::from_static("network");
/// assert_eq!(NETWORK.as_str(), "network");
/// assert_eq!(NETWORK, CapabilityId::new("network"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(Cow<'static, str>);

impl CapabilityId {
    /// Build a capability id from any string.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build a capability id from a static string, usable in `const` items.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The capability name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for CapabilityId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for CapabilityId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Identifies one runtime entry (one registered component instance).
///
/// Ids are handed out when a registration is enqueued, so callers on any
/// thread can later unregister the component they submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntryId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Shared monotonic allocator for [`EntryId`]s.
///
/// One allocator backs an orchestrator: every [`ChangeSender`](crate::ChangeSender)
/// clone and the graph's lazy factory instantiation draw from the same
/// counter, so ids never collide. Thread-safe.
#[derive(Clone, Debug)]
pub struct EntryIdAllocator(Arc<AtomicU64>);

impl EntryIdAllocator {
    /// Create an allocator whose first id is `EntryId(1)`.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }

    /// Allocate the next unused id.
    pub fn next_id(&self) -> EntryId {
        EntryId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EntryIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

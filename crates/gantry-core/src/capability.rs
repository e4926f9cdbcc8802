//! The [`CapabilitySet`]: an ordered, duplicate-free set of capabilities.

use smallvec::SmallVec;

use crate::id::CapabilityId;

/// An insertion-ordered set of [`CapabilityId`]s.
///
/// Components rarely declare more than a handful of capabilities, so the
/// set is a small inline vector with linear membership checks. Iteration
/// yields capabilities in declaration order, which is the order lazy
/// dependency resolution walks them.
#[derive(Clone, Debug, Default)]
pub struct CapabilitySet {
    items: SmallVec<[CapabilityId; 4]>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    pub fn empty() -> Self {
        Self {
            items: SmallVec::new(),
        }
    }

    /// Insert a capability. Returns `false` if it was already present.
    pub fn insert(&mut self, capability: CapabilityId) -> bool {
        if self.contains(&capability) {
            return false;
        }
        self.items.push(capability);
        true
    }

    /// Check whether the set contains a capability.
    pub fn contains(&self, capability: &CapabilityId) -> bool {
        self.items.iter().any(|c| c == capability)
    }

    /// Number of capabilities in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate capabilities in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, CapabilityId> {
        self.items.iter()
    }
}

impl PartialEq for CapabilitySet {
    /// Order-insensitive equality.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|c| other.contains(c))
    }
}

impl Eq for CapabilitySet {}

impl FromIterator<CapabilityId> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityId>>(iter: I) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a CapabilityId;
    type IntoIter = std::slice::Iter<'a, CapabilityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

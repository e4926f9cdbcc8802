//! Capability ownership: which entry currently satisfies each capability.

use gantry_core::{CapabilityId, CapabilitySet, EntryId};
use indexmap::IndexMap;

/// A capability that is already owned by another entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityConflict {
    /// The contested capability.
    pub capability: CapabilityId,
    /// Its current owner.
    pub owner: EntryId,
}

/// Capability → owning entry, in claim order.
///
/// Enforces the single-owner invariant: a capability is held by at most
/// one entry at any time.
#[derive(Clone, Debug, Default)]
pub struct CapabilityMap {
    owners: IndexMap<CapabilityId, EntryId>,
}

impl CapabilityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every capability in `supplies` for `entry`.
    ///
    /// All-or-nothing: if any capability is owned by a different entry,
    /// nothing is claimed and the first conflict is returned.
    pub fn claim(
        &mut self,
        entry: EntryId,
        supplies: &CapabilitySet,
    ) -> Result<(), CapabilityConflict> {
        for capability in supplies {
            if let Some(&owner) = self.owners.get(capability) {
                if owner != entry {
                    return Err(CapabilityConflict {
                        capability: capability.clone(),
                        owner,
                    });
                }
            }
        }
        for capability in supplies {
            self.owners.insert(capability.clone(), entry);
        }
        Ok(())
    }

    /// Release the capabilities in `supplies` that `entry` owns.
    ///
    /// Capabilities owned by someone else are left alone.
    pub fn release(&mut self, entry: EntryId, supplies: &CapabilitySet) {
        for capability in supplies {
            if self.owners.get(capability) == Some(&entry) {
                self.owners.shift_remove(capability);
            }
        }
    }

    /// Entry currently owning `capability`.
    pub fn owner(&self, capability: &CapabilityId) -> Option<EntryId> {
        self.owners.get(capability).copied()
    }

    /// Number of owned capabilities.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether no capability is owned.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Iterate `(capability, owner)` in claim order.
    pub fn iter(&self) -> impl Iterator<Item = (&CapabilityId, EntryId)> {
        self.owners.iter().map(|(c, &e)| (c, e))
    }
}

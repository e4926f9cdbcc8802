//! Structural errors detected while building or mutating the entry graph.

use std::error::Error;
use std::fmt;

use gantry_core::{CapabilityId, EntryId};

/// Diagnostic for one entry left over when the sorter stalls on a cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleEntry {
    /// The stuck entry.
    pub entry: EntryId,
    /// Its component kind.
    pub kind: String,
    /// Dependencies not yet placed when the sort stalled.
    pub unsolved: usize,
    /// Kinds of the entries it depends on.
    pub dependencies: Vec<String>,
    /// Kinds of the entries that depend on it.
    pub dependents: Vec<String>,
}

/// A structural failure in the component graph.
///
/// Returned synchronously by the operation that hit it. None of these are
/// retried: the offending change is dropped and the graph keeps its
/// previous shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A second entry tried to supply an already-owned capability.
    DuplicateCapability {
        /// The contested capability.
        capability: CapabilityId,
        /// Kind of the current owner.
        existing: String,
        /// Kind of the rejected component.
        incoming: String,
    },

    /// A factory was registered for a capability that already has one.
    DuplicateFactory {
        /// The capability with two factories.
        capability: CapabilityId,
    },

    /// A required capability has neither an owner nor a factory.
    UnresolvedDependency {
        /// The missing capability.
        capability: CapabilityId,
        /// Kind of the entry that required it.
        required_by: String,
    },

    /// The dependency graph contains at least one cycle.
    DependencyCycle {
        /// Every entry the sorter could not place.
        entries: Vec<CycleEntry>,
    },

    /// An entry cannot be removed while other entries depend on it.
    RemovalWithDependents {
        /// The entry that was to be removed.
        entry: EntryId,
        /// Its component kind.
        kind: String,
        /// Kinds of the entries still depending on it.
        dependents: Vec<String>,
    },

    /// A factory produced a component that does not supply the capability
    /// it was invoked for.
    FactoryMismatch {
        /// The capability the factory was registered for.
        capability: CapabilityId,
        /// Kind of the component it produced.
        produced: String,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCapability {
                capability,
                existing,
                incoming,
            } => write!(
                f,
                "capability '{capability}' is already supplied by '{existing}', \
                 cannot also be supplied by '{incoming}'"
            ),
            Self::DuplicateFactory { capability } => {
                write!(f, "capability '{capability}' already has a factory")
            }
            Self::UnresolvedDependency {
                capability,
                required_by,
            } => write!(
                f,
                "'{required_by}' requires '{capability}', which has no provider and no factory"
            ),
            Self::DependencyCycle { entries } => {
                write!(f, "dependency cycle among: ")?;
                for (i, e) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}' (entry {}, {} unsolved)", e.kind, e.entry, e.unsolved)?;
                }
                Ok(())
            }
            Self::RemovalWithDependents {
                entry,
                kind,
                dependents,
            } => write!(
                f,
                "cannot remove '{kind}' (entry {entry}): still required by {}",
                dependents.join(", ")
            ),
            Self::FactoryMismatch {
                capability,
                produced,
            } => write!(
                f,
                "factory for '{capability}' produced '{produced}', which does not supply it"
            ),
        }
    }
}

impl Error for GraphError {}

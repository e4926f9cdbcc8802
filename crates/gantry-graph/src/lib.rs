//! Capability ownership, factories, and dependency ordering for Gantry.
//!
//! [`EntryGraph`] owns the runtime entries. It enforces that each
//! capability has a single owner ([`CapabilityMap`]), instantiates missing
//! providers on demand ([`FactoryRegistry`]), and produces a
//! priority-stable topological order ([`sort_entries`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod capability;
pub mod entry;
pub mod error;
pub mod factory;
pub mod graph;
pub mod profile;
pub mod sort;

pub use capability::{CapabilityConflict, CapabilityMap};
pub use entry::RuntimeEntry;
pub use error::{CycleEntry, GraphError};
pub use factory::{FactoryId, FactoryRegistry};
pub use graph::{EntryGraph, Rebuild};
pub use profile::{EntryProfile, MovingAverage, PhaseProfile, MAX_PROFILING_WINDOW};
pub use sort::sort_entries;

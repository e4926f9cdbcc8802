//! Gantry: a plugin component orchestrator with dependency ordering and
//! time-budgeted round-robin scheduling.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Gantry sub-crates. For most users, adding `gantry` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::any::Any;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! use gantry::prelude::*;
//!
//! const CLOCK: CapabilityId = CapabilityId::from_static("clock");
//!
//! // Supplies a shared frame counter to whoever requires `clock`.
//! struct Clock(Arc<AtomicU64>);
//! impl Component for Clock {
//!     fn kind(&self) -> &str { "clock" }
//!     fn supplies(&self) -> CapabilitySet { [CLOCK].into_iter().collect() }
//!     fn service(&self) -> Option<Arc<dyn Any + Send + Sync>> {
//!         Some(self.0.clone())
//!     }
//!     fn update_before(&mut self) -> Result<(), ComponentError> {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//!
//! // Reads the counter it was handed at attach time.
//! #[derive(Default)]
//! struct Hud(Option<Arc<AtomicU64>>);
//! impl Component for Hud {
//!     fn kind(&self) -> &str { "hud" }
//!     fn dependencies(&self) -> CapabilitySet { [CLOCK].into_iter().collect() }
//!     fn on_dependency_satisfied(&mut self, _: &CapabilityId, provider: &Provider) {
//!         self.0 = provider.service::<AtomicU64>();
//!     }
//! }
//!
//! let mut orch = Orchestrator::new(OrchestratorConfig::default()).unwrap();
//! let hud = orch.register(Hud::default());
//! let clock = orch.register(Clock(Arc::new(AtomicU64::new(0))));
//! orch.attach().unwrap();
//! assert_eq!(orch.ordered_entries(), &[clock, hud]);
//!
//! for _ in 0..3 {
//!     orch.update_before().unwrap();
//!     // ... step the simulation ...
//!     orch.update_after().unwrap();
//! }
//! orch.detach().unwrap();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `gantry-core` | IDs, the `Component` trait, providers, change channel, blobs |
//! | [`graph`] | `gantry-graph` | Entry graph, capability map, factories, sorting, profiling |
//! | [`engine`] | `gantry-engine` | Orchestrator, round-robin scheduler, session persistence |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`gantry-core`).
///
/// Contains the [`types::Component`] trait, [`types::CapabilityId`] and
/// [`types::EntryId`], provider handles, the cross-thread
/// [`types::ChangeSender`], and [`types::ComponentConfig`] blobs.
pub use gantry_core as types;

/// Dependency graph (`gantry-graph`).
///
/// [`graph::EntryGraph`] owns registered entries, resolves them against
/// the capability map and lazy factories, and sorts them into dependency
/// order.
pub use gantry_graph as graph;

/// Orchestration (`gantry-engine`).
///
/// [`engine::Orchestrator`] applies queued changes at synchronization
/// points and drives attach, the two update phases, and detach.
pub use gantry_engine as engine;

/// Common imports for typical Gantry usage.
///
/// ```rust
/// use gantry::prelude::*;
/// ```
///
/// This imports the most frequently used types: the component trait and its
/// declarations, the orchestrator, and the error types.
pub mod prelude {
    // Core types and traits
    pub use gantry_core::{
        AttachContext, CapabilityId, CapabilitySet, ChangeSender, Component, ComponentConfig,
        EntryId, Factory, Phase, Provider,
    };

    // Errors
    pub use gantry_core::ComponentError;
    pub use gantry_engine::ConfigError;
    pub use gantry_graph::GraphError;

    // Engine
    pub use gantry_engine::{
        AttachState, Fault, Hook, KindRegistry, LifecycleEvent, Orchestrator,
        OrchestratorConfig, PhaseMetrics, SessionConfig,
    };
}

//! Orchestrator, change queue, and round-robin scheduler for Gantry.
//!
//! Provides the top-level [`Orchestrator`] that applies queued
//! registrations at synchronization points, attaches and detaches
//! components in dependency order, and drives the two per-frame update
//! phases with a time-budgeted round-robin continuation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod event;
mod guard;
pub mod metrics;
pub mod orchestrator;
pub mod pending;
pub mod registry;
pub mod schedule;
pub mod session;

pub use config::{ConfigError, OrchestratorConfig, DEFAULT_TOLERABLE_LAG};
pub use event::LifecycleEvent;
pub use metrics::{Fault, Hook, PhaseMetrics};
pub use orchestrator::{AttachState, Orchestrator};
pub use pending::{Drain, PendingQueue};
pub use registry::KindRegistry;
pub use schedule::{RoundRobin, RoundRobinOutcome, Tick};
pub use session::{SessionConfig, DEFAULT_SESSION_LAG_SECS};

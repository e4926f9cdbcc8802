//! Core types and traits for the Gantry component orchestrator.
//!
//! This is the leaf crate of the workspace. It defines the fundamental
//! abstractions shared by the graph and engine crates: capability and
//! entry identifiers, the [`Component`] trait, provider handles, the
//! cross-thread change channel, configuration blobs, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod capability;
pub mod change;
pub mod component;
pub mod config;
pub mod error;
pub mod id;
pub mod provider;

pub use capability::CapabilitySet;
pub use change::{change_channel, ChangeSender, PendingChange};
pub use component::{AttachContext, Component, Factory, Phase};
pub use config::ComponentConfig;
pub use error::ComponentError;
pub use id::{CapabilityId, EntryId, EntryIdAllocator};
pub use provider::{Provider, ProviderTable};

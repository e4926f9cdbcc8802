//! The [`Component`] trait, its [`AttachContext`], and the [`Phase`] enum.
//!
//! A component is an independent module that declares which capabilities
//! it requires and supplies. The orchestrator resolves those declarations
//! into a dependency order and drives the component's hooks.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::capability::CapabilitySet;
use crate::change::ChangeSender;
use crate::config::ComponentConfig;
use crate::error::ComponentError;
use crate::id::{CapabilityId, EntryId};
use crate::provider::{Provider, ProviderTable};

/// One of the two update phases driven each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Runs before the external simulation step.
    Before,
    /// Runs after the external simulation step.
    After,
}

impl Phase {
    /// Both phases, in frame order.
    pub const ALL: [Phase; 2] = [Phase::Before, Phase::After];

    /// Call the phase's full-pass update hook.
    pub fn update(self, component: &mut dyn Component) -> Result<(), ComponentError> {
        match self {
            Self::Before => component.update_before(),
            Self::After => component.update_after(),
        }
    }

    /// Call the phase's round-robin hook.
    pub fn tick_round_robin(self, component: &mut dyn Component) -> Result<bool, ComponentError> {
        match self {
            Self::Before => component.tick_before_round_robin(),
            Self::After => component.tick_after_round_robin(),
        }
    }

    /// Index into per-phase arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Before => 0,
            Self::After => 1,
        }
    }
}

/// A zero-argument constructor registered against one or more capabilities.
///
/// Used only for on-demand instantiation when a required capability has
/// no current owner.
pub type Factory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Orchestrator context handed to [`Component::on_attach`].
///
/// This is the component's only handle on the orchestrator: it can look up
/// providers and queue further registrations, but it can never reach the
/// graph directly.
pub struct AttachContext<'a> {
    entry: EntryId,
    changes: &'a ChangeSender,
    providers: &'a ProviderTable,
    tolerable_lag: Duration,
}

impl<'a> AttachContext<'a> {
    /// Build a context for attaching `entry`.
    pub fn new(
        entry: EntryId,
        changes: &'a ChangeSender,
        providers: &'a ProviderTable,
        tolerable_lag: Duration,
    ) -> Self {
        Self {
            entry,
            changes,
            providers,
            tolerable_lag,
        }
    }

    /// Id of the entry being attached.
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    /// Queue for registering or unregistering components.
    ///
    /// Clone it to keep a handle beyond `on_attach`. Changes take effect at
    /// the next synchronization point.
    pub fn changes(&self) -> &'a ChangeSender {
        self.changes
    }

    /// Provider currently satisfying `capability`, if any.
    pub fn provider(&self, capability: &CapabilityId) -> Option<&'a Provider> {
        self.providers.get(capability)
    }

    /// Wall-clock budget of each round-robin pass.
    pub fn tolerable_lag(&self) -> Duration {
        self.tolerable_lag
    }
}

/// A pluggable module driven by the orchestrator.
///
/// # Contract
///
/// - `dependencies()`, `supplies()` and `priority()` are read once when the
///   component is inserted into the graph, not per frame.
/// - Every hook except [`kind()`](Component::kind) has a no-op default.
/// - Hooks should be non-blocking and bounded. The round-robin budget is
///   advisory pacing; a hook that runs long overruns it.
/// - Errors and panics from hooks are contained per entry.
///
/// # Examples
///
/// ```
/// use gantry_core::{CapabilityId, CapabilitySet, Component, ComponentError};
///
/// const COMMANDS: CapabilityId = CapabilityId::from_static("commands");
/// const NETWORK: CapabilityId = CapabilityId::from_static("network");
///
/// struct CommandDispatch {
///     queued: u32,
/// }
///
/// impl Component for CommandDispatch {
///     fn kind(&self) -> &str { "command_dispatch" }
///
///     fn dependencies(&self) -> CapabilitySet {
///         [NETWORK].into_iter().collect()
///     }
///
///     fn supplies(&self) -> CapabilitySet {
///         [COMMANDS].into_iter().collect()
///     }
///
///     fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
///         if self.queued == 0 {
///             return Ok(false);
///         }
///         self.queued -= 1;
///         Ok(true)
///     }
/// }
///
/// let mut dispatch = CommandDispatch { queued: 1 };
/// assert!(dispatch.tick_after_round_robin().unwrap());
/// assert!(!dispatch.tick_after_round_robin().unwrap());
/// ```
pub trait Component: Send + 'static {
    /// Kind name, used for diagnostics and to match persisted configuration.
    fn kind(&self) -> &str;

    /// Capabilities this component requires.
    fn dependencies(&self) -> CapabilitySet {
        CapabilitySet::empty()
    }

    /// Capabilities this component provides. At most one active entry may
    /// supply a given capability.
    fn supplies(&self) -> CapabilitySet {
        CapabilitySet::empty()
    }

    /// Tie-break among entries with no ordering constraint; lower runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether [`save_configuration()`](Component::save_configuration) output
    /// belongs in the persisted session.
    fn save_to_storage(&self) -> bool {
        false
    }

    /// Shared object handed to dependents through [`Provider::service`].
    fn service(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }

    /// Called once per resolved dependency, before [`on_attach`](Component::on_attach).
    fn on_dependency_satisfied(&mut self, _capability: &CapabilityId, _provider: &Provider) {}

    /// Called when the component joins an attached orchestrator.
    fn on_attach(&mut self, _ctx: &AttachContext<'_>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called when the component leaves, in reverse dependency order.
    fn on_detach(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Apply a persisted configuration blob. Called before `on_attach`.
    fn load_configuration(&mut self, _config: &ComponentConfig) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Produce the blob to persist for this component.
    fn save_configuration(&self) -> Result<ComponentConfig, ComponentError> {
        Ok(ComponentConfig::new(self.kind()))
    }

    /// Flush any state ahead of a session save.
    fn save(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Full-pass update before the simulation step.
    fn update_before(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Full-pass update after the simulation step.
    fn update_after(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Incremental background work before the simulation step.
    ///
    /// Returns `Ok(true)` if meaningful work was done.
    fn tick_before_round_robin(&mut self) -> Result<bool, ComponentError> {
        Ok(false)
    }

    /// Incremental background work after the simulation step.
    ///
    /// Returns `Ok(true)` if meaningful work was done.
    fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
        Ok(false)
    }
}

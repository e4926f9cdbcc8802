//! Per-phase scheduling metrics.
//!
//! [`PhaseMetrics`] is returned by every `update_before` / `update_after`
//! call and captures timing, round-robin activity, and any per-entry
//! faults that were isolated during the phase.

use std::fmt;

use gantry_core::{ComponentError, EntryId, Phase};

/// The component hook a [`Fault`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    /// `update_before` / `update_after`.
    Update,
    /// `tick_before_round_robin` / `tick_after_round_robin`.
    RoundRobin,
    /// `on_dependency_satisfied` or `on_attach`.
    Attach,
    /// `on_detach`.
    Detach,
    /// `load_configuration`.
    LoadConfiguration,
    /// `save`.
    Save,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Update => "update",
            Self::RoundRobin => "round-robin tick",
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::LoadConfiguration => "load configuration",
            Self::Save => "save",
        };
        f.write_str(name)
    }
}

/// A contained per-entry failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    /// The failing entry.
    pub entry: EntryId,
    /// Its component kind.
    pub kind: String,
    /// Which hook failed.
    pub hook: Hook,
    /// What went wrong.
    pub error: ComponentError,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' (entry {}) {}: {}",
            self.kind, self.entry, self.hook, self.error
        )
    }
}

/// Timing and activity for one phase of one frame.
///
/// All durations are in microseconds, measured from the start of the phase.
#[derive(Clone, Debug)]
pub struct PhaseMetrics {
    /// Which phase these metrics describe.
    pub phase: Phase,
    /// Wall-clock time for the whole phase, including change application.
    pub total_us: u64,
    /// Time spent in the full update pass.
    pub update_us: u64,
    /// Time spent in the round-robin scan.
    pub round_robin_us: u64,
    /// Round-robin hooks called.
    pub round_robin_ticks: u32,
    /// Round-robin hooks that reported work.
    pub round_robin_productive: u32,
    /// Pending changes applied at the start of the phase.
    pub changes_applied: usize,
    /// Faults isolated during the phase, plus any lifecycle faults since
    /// the previous phase.
    pub faults: Vec<Fault>,
}

impl PhaseMetrics {
    /// Zeroed metrics for `phase`.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            total_us: 0,
            update_us: 0,
            round_robin_us: 0,
            round_robin_ticks: 0,
            round_robin_productive: 0,
            changes_applied: 0,
            faults: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metrics_are_zero() {
        let m = PhaseMetrics::new(Phase::After);
        assert_eq!(m.phase, Phase::After);
        assert_eq!(m.total_us, 0);
        assert_eq!(m.round_robin_ticks, 0);
        assert!(m.faults.is_empty());
    }

    #[test]
    fn fault_display_names_entry_and_hook() {
        let fault = Fault {
            entry: EntryId(7),
            kind: "cache".into(),
            hook: Hook::RoundRobin,
            error: ComponentError::failed("evicted too much"),
        };
        assert_eq!(
            fault.to_string(),
            "'cache' (entry 7) round-robin tick: hook failed: evicted too much"
        );
    }
}

//! Time-budgeted round-robin continuation scan.
//!
//! After the full update pass, each phase hands the remaining frame
//! budget to a [`RoundRobin`] scanner. It visits entries circularly from
//! a persistent cursor, one round-robin tick each, until the budget is
//! spent or a full lap goes by without anyone reporting work.

use std::time::Duration;

/// Outcome of visiting one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// The entry did meaningful work.
    Worked,
    /// The entry had nothing to do, or its hook failed.
    Idle,
    /// The entry was not called (it faulted earlier in the phase).
    Skipped,
}

/// Counters for one round-robin scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundRobinOutcome {
    /// Hooks actually called.
    pub ticks: u32,
    /// Hooks that reported work.
    pub productive: u32,
}

/// Per-phase round-robin cursor.
///
/// The cursor survives across frames, so when the budget cuts a scan
/// short the next frame resumes where this one stopped.
#[derive(Clone, Debug, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    /// A scanner starting at position 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Position the next scan starts from.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Scan `len` positions.
    ///
    /// Keeps calling `tick` while `elapsed() < budget` and fewer than
    /// `len` consecutive positions came back without work. A zero budget
    /// therefore performs no ticks.
    pub fn run(
        &mut self,
        len: usize,
        budget: Duration,
        elapsed: impl Fn() -> Duration,
        mut tick: impl FnMut(usize) -> Tick,
    ) -> RoundRobinOutcome {
        let mut outcome = RoundRobinOutcome::default();
        if len == 0 {
            self.cursor = 0;
            return outcome;
        }
        if self.cursor >= len {
            self.cursor = 0;
        }

        let mut idle = 0;
        while idle < len && elapsed() < budget {
            match tick(self.cursor) {
                Tick::Worked => {
                    outcome.ticks += 1;
                    outcome.productive += 1;
                    idle = 0;
                }
                Tick::Idle => {
                    outcome.ticks += 1;
                    idle += 1;
                }
                Tick::Skipped => idle += 1,
            }
            self.cursor = (self.cursor + 1) % len;
        }
        outcome
    }
}

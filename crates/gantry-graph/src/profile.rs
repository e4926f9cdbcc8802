//! Rolling per-entry timing statistics.
//!
//! Every entry keeps, for each phase, moving averages of its full-pass
//! update time, its round-robin time, and the number of round-robin ticks
//! it received. A window length of zero disables collection.

use std::collections::VecDeque;
use std::time::Duration;

use gantry_core::Phase;

/// Upper bound on the moving-average window, in samples.
pub const MAX_PROFILING_WINDOW: usize = 4096;

/// Fixed-window moving average with an O(1) running sum.
#[derive(Clone, Debug, Default)]
pub struct MovingAverage {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl MovingAverage {
    /// Create an average over the last `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    /// Add a sample, evicting the oldest if the window is full.
    pub fn record(&mut self, sample: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= old;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;
    }

    /// Change the window length, keeping the newest samples.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
        // Recompute to shed accumulated rounding error.
        self.sum = self.samples.iter().sum();
    }

    /// Mean of the samples in the window, or `None` if there are none.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.sum / self.samples.len() as f64)
        }
    }

    /// Number of samples currently in the window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Window length.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Statistics for one entry in one phase.
#[derive(Clone, Debug, Default)]
pub struct PhaseProfile {
    /// Full-pass update time, microseconds.
    pub update_us: MovingAverage,
    /// Total round-robin time per phase, microseconds.
    pub round_robin_us: MovingAverage,
    /// Round-robin ticks received per phase.
    pub round_robin_jobs: MovingAverage,
    pending_us: f64,
    pending_jobs: u32,
}

impl PhaseProfile {
    fn new(capacity: usize) -> Self {
        Self {
            update_us: MovingAverage::new(capacity),
            round_robin_us: MovingAverage::new(capacity),
            round_robin_jobs: MovingAverage::new(capacity),
            pending_us: 0.0,
            pending_jobs: 0,
        }
    }

    /// Record one full-pass update.
    pub fn record_update(&mut self, elapsed: Duration) {
        self.update_us.record(elapsed.as_secs_f64() * 1e6);
    }

    /// Accumulate one round-robin tick into the current phase.
    pub fn record_round_robin_tick(&mut self, elapsed: Duration) {
        self.pending_us += elapsed.as_secs_f64() * 1e6;
        self.pending_jobs += 1;
    }

    /// Close the current phase's round-robin accumulators into the averages.
    pub fn commit_round_robin(&mut self) {
        self.round_robin_us.record(self.pending_us);
        self.round_robin_jobs.record(f64::from(self.pending_jobs));
        self.pending_us = 0.0;
        self.pending_jobs = 0;
    }

    fn resize(&mut self, capacity: usize) {
        self.update_us.resize(capacity);
        self.round_robin_us.resize(capacity);
        self.round_robin_jobs.resize(capacity);
    }
}

/// Both phases' statistics for one entry.
#[derive(Clone, Debug, Default)]
pub struct EntryProfile {
    phases: [PhaseProfile; 2],
}

impl EntryProfile {
    /// Create a profile with the given window length (0 disables it).
    pub fn new(capacity: usize) -> Self {
        Self {
            phases: [PhaseProfile::new(capacity), PhaseProfile::new(capacity)],
        }
    }

    /// Statistics for `phase`.
    pub fn phase(&self, phase: Phase) -> &PhaseProfile {
        &self.phases[phase.index()]
    }

    /// Mutable statistics for `phase`.
    pub fn phase_mut(&mut self, phase: Phase) -> &mut PhaseProfile {
        &mut self.phases[phase.index()]
    }

    /// Change the window length of every average.
    pub fn resize(&mut self, capacity: usize) {
        for p in &mut self.phases {
            p.resize(capacity);
        }
    }

    /// Whether collection is enabled.
    pub fn is_enabled(&self) -> bool {
        self.phases[0].update_us.capacity() > 0
    }
}

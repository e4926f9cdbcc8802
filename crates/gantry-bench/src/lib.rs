//! Benchmark profiles and utilities for the Gantry component orchestrator.
//!
//! Provides pre-built component sets for benchmarking:
//!
//! - [`chain_profile`]: a linear dependency chain, registered leaf first
//! - [`layered_profile`]: `layers` x `width` entries, each depending on
//!   every entry of the previous layer
//! - [`attached_orchestrator`]: registers a profile and attaches it

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

use gantry_core::{CapabilityId, CapabilitySet, Component, ComponentError};
use gantry_engine::{Orchestrator, OrchestratorConfig};

/// A component with configurable declarations and a fixed amount of
/// round-robin work per frame.
///
/// `update_before` refills the backlog to `jobs_per_frame`; every
/// round-robin tick (in either phase) consumes one job and spins a small
/// arithmetic loop so ticks are not free.
pub struct BenchComponent {
    name: String,
    requires: CapabilitySet,
    supplies: CapabilitySet,
    priority: i32,
    jobs_per_frame: u32,
    remaining: u32,
    acc: u64,
}

impl BenchComponent {
    /// A component named `name` with no declarations and no work.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: CapabilitySet::empty(),
            supplies: CapabilitySet::empty(),
            priority: 0,
            jobs_per_frame: 0,
            remaining: 0,
            acc: 0,
        }
    }

    /// Add a required capability.
    pub fn requires(mut self, capability: CapabilityId) -> Self {
        self.requires.insert(capability);
        self
    }

    /// Add a supplied capability.
    pub fn supplies(mut self, capability: CapabilityId) -> Self {
        self.supplies.insert(capability);
        self
    }

    /// Set the sort priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Round-robin jobs made available at the start of each frame.
    pub fn jobs_per_frame(mut self, jobs: u32) -> Self {
        self.jobs_per_frame = jobs;
        self
    }

    fn spin(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        for i in 0..64u64 {
            self.acc = self.acc.wrapping_mul(6364136223846793005).wrapping_add(i);
        }
        true
    }
}

impl Component for BenchComponent {
    fn kind(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> CapabilitySet {
        self.requires.clone()
    }

    fn supplies(&self) -> CapabilitySet {
        self.supplies.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn update_before(&mut self) -> Result<(), ComponentError> {
        self.remaining = self.jobs_per_frame;
        Ok(())
    }

    fn tick_before_round_robin(&mut self) -> Result<bool, ComponentError> {
        Ok(self.spin())
    }

    fn tick_after_round_robin(&mut self) -> Result<bool, ComponentError> {
        Ok(self.spin())
    }
}

fn capability(name: &str) -> CapabilityId {
    CapabilityId::new(name.to_owned())
}

/// Build a chain of `n` components where entry `i` requires the
/// capability supplied by entry `i - 1`.
///
/// Returned in reverse dependency order, so the sorter has to move every
/// entry.
pub fn chain_profile(n: usize) -> Vec<BenchComponent> {
    let mut components: Vec<BenchComponent> = (0..n)
        .map(|i| {
            let mut c = BenchComponent::new(format!("chain{i}")).supplies(capability(&format!("c{i}")));
            if i > 0 {
                c = c.requires(capability(&format!("c{}", i - 1)));
            }
            c
        })
        .collect();
    components.reverse();
    components
}

/// Build `layers` x `width` components. Every entry of layer `l` requires
/// every capability of layer `l - 1`; priorities vary within a layer.
pub fn layered_profile(layers: usize, width: usize) -> Vec<BenchComponent> {
    let mut components = Vec::with_capacity(layers * width);
    for l in 0..layers {
        for w in 0..width {
            let mut c = BenchComponent::new(format!("l{l}w{w}"))
                .supplies(capability(&format!("l{l}.{w}")))
                .priority((w % 3) as i32);
            if l > 0 {
                for p in 0..width {
                    c = c.requires(capability(&format!("l{}.{p}", l - 1)));
                }
            }
            components.push(c);
        }
    }
    components
}

/// Register `components` on a fresh orchestrator with the given round-robin
/// budget and attach it.
///
/// # Panics
///
/// Panics if the profile does not resolve, which only happens when a
/// caller builds an inconsistent profile by hand.
pub fn attached_orchestrator(components: Vec<BenchComponent>, lag: Duration) -> Orchestrator {
    let mut orch = Orchestrator::new(OrchestratorConfig {
        tolerable_lag: lag,
        ..OrchestratorConfig::default()
    })
    .unwrap();
    for c in components {
        orch.register(c);
    }
    orch.attach().unwrap();
    orch
}

//! Test utilities and mock components for Gantry development.
//!
//! Provides a shared [`EventLog`] that mock components write their hook
//! calls into, plus the reusable fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::{Arc, Mutex, MutexGuard};

use gantry_core::{CapabilityId, Component, Factory};

pub mod fixtures;

pub use fixtures::{
    ConfigurableComponent, FailingComponent, FailingHook, PanickingComponent, RecordingComponent,
    Settings, SlowComponent, WorkerComponent,
};

/// Shared, thread-safe record of hook calls.
///
/// Components are moved into the orchestrator on registration, so tests
/// keep a clone of the log and inspect it afterwards.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.lock().push(event.into());
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Events ending in `:{suffix}`, with the suffix stripped.
    ///
    /// `log.with_suffix("attach")` turns `["a:attach", "b:update_before",
    /// "b:attach"]` into `["a", "b"]`.
    pub fn with_suffix(&self, suffix: &str) -> Vec<String> {
        let tail = format!(":{suffix}");
        self.lock()
            .iter()
            .filter_map(|e| e.strip_suffix(&tail).map(str::to_owned))
            .collect()
    }

    /// Index of the first occurrence of `event`.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.lock().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.lock().iter().filter(|e| *e == event).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A panicking test component must not hide the log from the test.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shorthand for a capability id built from a static name.
pub fn cap(name: &'static str) -> CapabilityId {
    CapabilityId::from_static(name)
}

/// Wrap a constructor closure as a [`Factory`].
pub fn factory<C, F>(make: F) -> Factory
where
    C: Component,
    F: Fn() -> C + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn Component>)
}

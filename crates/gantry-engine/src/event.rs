//! Lifecycle notifications.

use crossbeam_channel::{Receiver, Sender};
use gantry_core::EntryId;

/// Emitted when an entry is attached to or detached from the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `on_attach` has been called for the entry.
    Attached {
        /// The entry.
        entry: EntryId,
        /// Its component kind.
        kind: String,
    },
    /// `on_detach` has been called for the entry.
    Detached {
        /// The entry.
        entry: EntryId,
        /// Its component kind.
        kind: String,
    },
}

impl LifecycleEvent {
    /// The entry the event is about.
    pub fn entry(&self) -> EntryId {
        match self {
            Self::Attached { entry, .. } | Self::Detached { entry, .. } => *entry,
        }
    }
}

/// Fan-out of lifecycle events to any number of subscribers.
///
/// Subscribers whose receiver has been dropped are pruned on the next emit.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Vec<Sender<LifecycleEvent>>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self) -> Receiver<LifecycleEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: LifecycleEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

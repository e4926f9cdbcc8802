//! Control-thread side of the registration channel.
//!
//! [`PendingQueue`] wraps the receiving end of the change channel created
//! by [`change_channel`](gantry_core::change_channel). Only the
//! orchestrator's control thread drains it, and only at synchronization
//! points.

use crossbeam_channel::Receiver;
use gantry_core::PendingChange;

/// Queue of registrations and unregistrations awaiting a synchronization point.
#[derive(Debug)]
pub struct PendingQueue {
    rx: Receiver<PendingChange>,
}

impl PendingQueue {
    /// Wrap the receiving end of a change channel.
    pub fn new(rx: Receiver<PendingChange>) -> Self {
        Self { rx }
    }

    /// Number of changes currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no change is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Take the changes queued so far, in submission order.
    ///
    /// The batch size is fixed when the drain starts: changes enqueued
    /// while the returned iterator is being consumed (for example by a
    /// component's `on_attach`) stay queued for the next drain. Dropping
    /// the iterator early leaves the unconsumed changes queued as well.
    pub fn drain(&self) -> Drain {
        Drain {
            rx: self.rx.clone(),
            remaining: self.rx.len(),
        }
    }
}

/// Iterator over one synchronization point's batch of changes.
///
/// Owns its own receiver handle, so the orchestrator can mutate itself
/// while iterating.
#[derive(Debug)]
pub struct Drain {
    rx: Receiver<PendingChange>,
    remaining: usize,
}

impl Iterator for Drain {
    type Item = PendingChange;

    fn next(&mut self) -> Option<PendingChange> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.rx.try_recv().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

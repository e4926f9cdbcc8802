//! Cross-thread registration channel.
//!
//! Registration and unregistration never touch orchestrator state
//! directly. A [`ChangeSender`] only appends [`PendingChange`]s to an
//! unbounded crossbeam channel; the orchestrator's control thread drains
//! it at synchronization points.

use std::fmt;

use crossbeam_channel::{Receiver, Sender};

use crate::component::Component;
use crate::config::ComponentConfig;
use crate::id::{EntryId, EntryIdAllocator};

/// A queued mutation of the component set.
pub enum PendingChange {
    /// Insert a component, optionally with a persisted configuration blob.
    Add {
        /// Id reserved for the new entry.
        entry: EntryId,
        /// The component instance.
        component: Box<dyn Component>,
        /// Configuration to load when the entry is attached.
        config: Option<ComponentConfig>,
    },
    /// Remove a previously registered entry.
    Remove {
        /// The entry to remove.
        entry: EntryId,
    },
}

impl PendingChange {
    /// The entry this change targets.
    pub fn entry(&self) -> EntryId {
        match self {
            Self::Add { entry, .. } | Self::Remove { entry } => *entry,
        }
    }
}

impl fmt::Debug for PendingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add {
                entry,
                component,
                config,
            } => f
                .debug_struct("Add")
                .field("entry", entry)
                .field("kind", &component.kind())
                .field("has_config", &config.is_some())
                .finish(),
            Self::Remove { entry } => f.debug_struct("Remove").field("entry", entry).finish(),
        }
    }
}

/// Cloneable, thread-safe handle for queueing registrations.
///
/// Every method is non-blocking. If the owning orchestrator has been
/// dropped the change is silently discarded.
#[derive(Clone)]
pub struct ChangeSender {
    tx: Sender<PendingChange>,
    ids: EntryIdAllocator,
}

impl ChangeSender {
    /// Queue a component for registration and return its reserved id.
    pub fn register(&self, component: Box<dyn Component>) -> EntryId {
        self.enqueue_add(component, None)
    }

    /// Queue a component together with a configuration blob to load on attach.
    pub fn register_with_config(
        &self,
        component: Box<dyn Component>,
        config: ComponentConfig,
    ) -> EntryId {
        self.enqueue_add(component, Some(config))
    }

    /// Queue removal of an entry.
    pub fn unregister(&self, entry: EntryId) {
        // Best-effort: a dropped orchestrator has nothing left to remove.
        let _ = self.tx.send(PendingChange::Remove { entry });
    }

    /// Number of changes waiting for the next synchronization point.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    fn enqueue_add(&self, component: Box<dyn Component>, config: Option<ComponentConfig>) -> EntryId {
        let entry = self.ids.next_id();
        let _ = self.tx.send(PendingChange::Add {
            entry,
            component,
            config,
        });
        entry
    }
}

impl fmt::Debug for ChangeSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSender")
            .field("pending", &self.tx.len())
            .finish()
    }
}

/// Create a change channel whose senders reserve ids from `ids`.
pub fn change_channel(ids: EntryIdAllocator) -> (ChangeSender, Receiver<PendingChange>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ChangeSender { tx, ids }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Component for Named {
        fn kind(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn register_reserves_sequential_ids() {
        let (tx, rx) = change_channel(EntryIdAllocator::new());
        let a = tx.register(Box::new(Named("a")));
        let b = tx.register_with_config(Box::new(Named("b")), ComponentConfig::new("b"));
        assert_eq!(a, EntryId(1));
        assert_eq!(b, EntryId(2));
        assert_eq!(tx.pending(), 2);

        match rx.try_recv().unwrap() {
            PendingChange::Add { entry, config, .. } => {
                assert_eq!(entry, a);
                assert!(config.is_none());
            }
            other => panic!("expected Add, got {other:?}"),
        }
        match rx.try_recv().unwrap() {
            PendingChange::Add { entry, config, .. } => {
                assert_eq!(entry, b);
                assert_eq!(config, Some(ComponentConfig::new("b")));
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn unregister_enqueues_remove() {
        let (tx, rx) = change_channel(EntryIdAllocator::new());
        tx.unregister(EntryId(9));
        let change = rx.try_recv().unwrap();
        assert!(matches!(change, PendingChange::Remove { entry: EntryId(9) }));
        assert_eq!(change.entry(), EntryId(9));
    }

    #[test]
    fn senders_work_from_other_threads() {
        let (tx, rx) = change_channel(EntryIdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tx = tx.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        tx.register(Box::new(Named("worker")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(rx.len(), 100);
    }

    #[test]
    fn sending_after_receiver_dropped_is_harmless() {
        let (tx, rx) = change_channel(EntryIdAllocator::new());
        drop(rx);
        let id = tx.register(Box::new(Named("late")));
        tx.unregister(id);
        assert_eq!(tx.pending(), 0);
    }
}

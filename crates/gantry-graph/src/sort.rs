//! Layered topological sort of the entry graph.

use gantry_core::EntryId;
use indexmap::IndexMap;
use log::error;

use crate::entry::RuntimeEntry;
use crate::error::{CycleEntry, GraphError};

/// Order `entries` so that every entry comes after all of its dependencies.
///
/// Kahn's algorithm, one layer at a time: each round takes every remaining
/// entry with no unsolved dependencies, then decrements the counters of
/// their dependents. A layer is sorted by ascending priority; ties keep
/// the map's insertion (registration) order.
///
/// If a round finds nothing ready while entries remain, the graph has a
/// cycle and [`GraphError::DependencyCycle`] lists every entry that could
/// not be placed. No partial order is returned.
///
/// Leaves each entry's `unsolved` counter at its residual value.
pub fn sort_entries(
    entries: &mut IndexMap<EntryId, RuntimeEntry>,
) -> Result<Vec<EntryId>, GraphError> {
    for entry in entries.values_mut() {
        entry.unsolved = entry.dependencies.len();
    }

    let mut order = Vec::with_capacity(entries.len());
    let mut remaining: Vec<EntryId> = entries.keys().copied().collect();

    while !remaining.is_empty() {
        // Partition before decrementing so the layer reflects the
        // counters as they stood when the round began.
        let (mut ready, blocked): (Vec<EntryId>, Vec<EntryId>) = remaining
            .into_iter()
            .partition(|id| entries.get(id).is_some_and(|e| e.unsolved == 0));

        if ready.is_empty() {
            return Err(cycle_error(entries, &blocked));
        }

        for id in &ready {
            let dependents = match entries.get(id) {
                Some(e) => e.dependents.clone(),
                None => continue,
            };
            for dependent in dependents {
                if let Some(d) = entries.get_mut(&dependent) {
                    d.unsolved = d.unsolved.saturating_sub(1);
                }
            }
        }

        ready.sort_by_key(|id| entries.get(id).map_or(0, RuntimeEntry::priority));
        order.extend(ready);
        remaining = blocked;
    }

    Ok(order)
}

fn cycle_error(entries: &IndexMap<EntryId, RuntimeEntry>, stuck: &[EntryId]) -> GraphError {
    let kinds = |ids: &[EntryId]| -> Vec<String> {
        ids.iter()
            .filter_map(|id| entries.get(id))
            .map(|e| e.kind().to_owned())
            .collect()
    };

    let mut report = Vec::with_capacity(stuck.len());
    for id in stuck {
        let Some(entry) = entries.get(id) else {
            continue;
        };
        let diag = CycleEntry {
            entry: *id,
            kind: entry.kind().to_owned(),
            unsolved: entry.unsolved,
            dependencies: kinds(entry.dependencies()),
            dependents: kinds(entry.dependents()),
        };
        error!(
            "dependency cycle: '{}' (entry {}) has {} unsolved; depends on [{}]; required by [{}]",
            diag.kind,
            diag.entry,
            diag.unsolved,
            diag.dependencies.join(", "),
            diag.dependents.join(", "),
        );
        report.push(diag);
    }
    GraphError::DependencyCycle { entries: report }
}

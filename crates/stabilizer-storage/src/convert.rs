//! Decompose/recompose conversions between StabilizationState and Snapshot.
//!
//! [`decompose`] flattens the arena into records whose position is the
//! node's rank in handle order. [`recompose`] rebuilds the arena in two
//! passes (nodes first, then edges), so handles after a reload may differ
//! from the ones before a save while the graph stays isomorphic.

use std::collections::{BTreeMap, HashMap};

use stabilizer_core::{
    Atom, NodeId, Package, PackageState, PriorityEntry, PriorityQueue, Quorum,
    StabilizationState, TicketId, UseFlagCombination, VoteTally,
};

use crate::error::StorageError;
use crate::snapshot::{PackageRecord, PriorityRecord, Snapshot};

/// Flattens `state` into a [`Snapshot`].
pub fn decompose(state: &StabilizationState) -> Snapshot {
    let graph = &state.graph;

    let positions: HashMap<NodeId, usize> = graph
        .iter()
        .enumerate()
        .map(|(pos, (id, _))| (id, pos))
        .collect();

    let packages = graph
        .iter()
        .map(|(id, pkg)| PackageRecord {
            cpv: pkg.atom.to_string(),
            indices: graph
                .dependencies(id)
                .iter()
                .filter_map(|dep| positions.get(dep).copied())
                .collect(),
            use_flags: pkg
                .combinations
                .iter()
                .map(|combo| combo.flags().map(str::to_string).collect())
                .collect(),
            num_stable: pkg.active_combination,
            state: pkg.state.code(),
        })
        .collect();

    Snapshot {
        packages,
        stable: string_counts(state.votes.stable_counts()),
        unstable: string_counts(state.votes.unstable_counts()),
        priority: state
            .priority
            .iter()
            .map(|entry| PriorityRecord {
                cpv: entry.atom.to_string(),
                ticket: entry.ticket.0,
            })
            .collect(),
    }
}

/// Rebuilds a [`StabilizationState`] from a [`Snapshot`].
///
/// Rejects out-of-range indices, unknown state codes, malformed atoms,
/// duplicate live atoms and sentinels with dependencies. The result is not
/// re-evaluated; a snapshot written by hand may still contain a cycle.
pub fn recompose(snapshot: Snapshot, quorum: Quorum) -> Result<StabilizationState, StorageError> {
    let mut state = StabilizationState::new(quorum);
    let count = snapshot.packages.len();

    // Pass one: nodes.
    let mut ids = Vec::with_capacity(count);
    for (pos, record) in snapshot.packages.iter().enumerate() {
        let atom = Atom::new(record.cpv.as_str())?;
        let package_state = PackageState::from_code(record.state)?;
        let package = Package {
            atom,
            state: package_state,
            combinations: record
                .use_flags
                .iter()
                .map(|flags| UseFlagCombination::from_flags(flags.iter().cloned()))
                .collect(),
            active_combination: record.num_stable,
        };
        let id = state.graph.push_package(package).map_err(|e| StorageError::Reconstruction {
            reason: format!("record {pos}: {e}"),
        })?;
        ids.push(id);
    }

    // Pass two: edges.
    for (pos, record) in snapshot.packages.iter().enumerate() {
        for &dep in &record.indices {
            if dep >= count {
                return Err(StorageError::Reconstruction {
                    reason: format!(
                        "record {pos} ('{}') references index {dep}, snapshot has {count} records",
                        record.cpv
                    ),
                });
            }
            state
                .graph
                .push_dependency(ids[pos], ids[dep])
                .map_err(|e| StorageError::Reconstruction {
                    reason: format!("record {pos}: {e}"),
                })?;
        }
    }

    let stable = atom_counts(snapshot.stable)?;
    let unstable = atom_counts(snapshot.unstable)?;
    state.votes = VoteTally::from_counts(quorum, stable, unstable);

    let mut entries = Vec::with_capacity(snapshot.priority.len());
    for record in snapshot.priority {
        entries.push(PriorityEntry {
            atom: Atom::new(record.cpv)?,
            ticket: TicketId(record.ticket),
        });
    }
    state.priority = PriorityQueue::from_entries(entries);

    Ok(state)
}

fn string_counts(counts: &HashMap<Atom, u32>) -> BTreeMap<String, u32> {
    counts
        .iter()
        .map(|(atom, n)| (atom.to_string(), *n))
        .collect()
}

fn atom_counts<I>(counts: I) -> Result<HashMap<Atom, u32>, StorageError>
where
    I: IntoIterator<Item = (String, u32)>,
{
    counts
        .into_iter()
        .map(|(atom, n)| Ok((Atom::new(atom)?, n)))
        .collect()
}

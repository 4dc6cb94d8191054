//! StabilizationState: the whole mutable model behind the service.
//!
//! Groups the graph, vote counters and priority queue so that a single lock
//! guards them together and a single snapshot persists them together.

use rand::Rng;

use crate::atom::Atom;
use crate::graph::{DependencyOutcome, PackageGraph};
use crate::id::{NodeId, TicketId};
use crate::leaves::{pick_leaf, LeafPolicy};
use crate::package::{Package, UseFlagCombination};
use crate::priority::PriorityQueue;
use crate::votes::{Quorum, Verdict, VoteOutcome, VoteTally};

/// What a worker should build next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A pinned package, ahead of the leaves.
    Priority { atom: Atom, ticket: TicketId },
    /// A leaf chosen under the requested policy.
    Leaf {
        id: NodeId,
        atom: Atom,
        combination: Option<UseFlagCombination>,
    },
}

impl WorkItem {
    pub fn atom(&self) -> &Atom {
        match self {
            WorkItem::Priority { atom, .. } | WorkItem::Leaf { atom, .. } => atom,
        }
    }

    /// Wire form: the atom, followed by the active combination's flags.
    pub fn to_wire(&self) -> String {
        match self {
            WorkItem::Leaf {
                atom,
                combination: Some(combo),
                ..
            } if !combo.is_empty() => format!("{atom} {combo}"),
            other => other.atom().to_string(),
        }
    }
}

/// Graph, votes and priority queue.
#[derive(Debug, Clone, Default)]
pub struct StabilizationState {
    pub graph: PackageGraph,
    pub votes: VoteTally,
    pub priority: PriorityQueue,
}

impl StabilizationState {
    pub fn new(quorum: Quorum) -> Self {
        StabilizationState {
            graph: PackageGraph::new(),
            votes: VoteTally::new(quorum),
            priority: PriorityQueue::new(),
        }
    }

    /// Records `parent` depends on `child`.
    pub fn schedule_dependency(&mut self, parent: &Atom, child: &Atom) -> DependencyOutcome {
        self.graph.add_dependency(parent, child)
    }

    /// Applies one worker verdict.
    pub fn vote(&mut self, atom: &Atom, verdict: Verdict) -> VoteOutcome {
        self.votes.record(&mut self.graph, atom, verdict)
    }

    /// Ensures a package exists. Returns true if it was created.
    pub fn add_package(&mut self, atom: &Atom) -> bool {
        self.graph.get_or_create(atom).1
    }

    /// Registers a combination, creating the package if needed.
    pub fn add_combination(&mut self, atom: &Atom, combination: UseFlagCombination) -> bool {
        self.graph.add_combination(atom, combination)
    }

    /// Next work item: a priority entry if any are pinned, else a random leaf.
    pub fn next_work<R: Rng + ?Sized>(&mut self, policy: LeafPolicy, rng: &mut R) -> Option<WorkItem> {
        if let Some(entry) = self.priority.rotate() {
            return Some(WorkItem::Priority {
                atom: entry.atom,
                ticket: entry.ticket,
            });
        }
        let id = pick_leaf(&self.graph, policy, rng)?;
        let package: &Package = self.graph.package(id)?;
        let combination = match policy {
            LeafPolicy::Plain => None,
            LeafPolicy::PerCombination => package.current_combination().cloned(),
        };
        Some(WorkItem::Leaf {
            id,
            atom: package.atom.clone(),
            combination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn atom(s: &str) -> Atom {
        Atom::new(s).unwrap()
    }

    #[test]
    fn priority_precedes_leaves() {
        let mut state = StabilizationState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        state.add_package(&atom("s/leaf-1"));
        state.priority.enqueue(atom("s/urgent-1"), TicketId(77));

        for _ in 0..3 {
            let item = state.next_work(LeafPolicy::Plain, &mut rng).unwrap();
            assert_eq!(item.to_wire(), "s/urgent-1");
        }

        assert_eq!(state.priority.retire("s/urgent-1"), Some(TicketId(77)));
        let item = state.next_work(LeafPolicy::Plain, &mut rng).unwrap();
        assert_eq!(item.to_wire(), "s/leaf-1");
    }

    #[test]
    fn chain_scenario_walks_up() {
        let mut state = StabilizationState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        state.schedule_dependency(&atom("s/a-1"), &atom("s/b-1"));
        state.schedule_dependency(&atom("s/b-1"), &atom("s/c-1"));

        for expected in ["s/c-1", "s/b-1", "s/a-1"] {
            let item = state.next_work(LeafPolicy::Plain, &mut rng).unwrap();
            assert_eq!(item.atom().as_str(), expected);
            state.vote(&atom(expected), Verdict::Stable);
            state.vote(&atom(expected), Verdict::Stable);
            assert_eq!(state.graph.get(expected).unwrap().state, PackageState::Stable);
        }
        assert!(state.next_work(LeafPolicy::Plain, &mut rng).is_none());
    }

    #[test]
    fn combination_leaf_carries_flags() {
        let mut state = StabilizationState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        state.add_combination(&atom("s/x-1"), UseFlagCombination::parse("ssl -gtk"));

        let item = state
            .next_work(LeafPolicy::PerCombination, &mut rng)
            .unwrap();
        assert_eq!(item.to_wire(), "s/x-1 -gtk ssl");
        assert!(state.next_work(LeafPolicy::Plain, &mut rng).is_none());
    }
}

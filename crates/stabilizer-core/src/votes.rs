//! Vote tally: quorum-based state transitions.
//!
//! Workers report independent verdicts. A single report never changes a
//! package; its state flips only once a quorum of identical verdicts has
//! accumulated. Counters are keyed by atom, so they survive sentinel churn
//! in the graph, and they never decrease.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::graph::PackageGraph;
use crate::package::PackageState;

/// Stable votes needed to promote a package.
pub const STABLE_QUORUM: u32 = 2;
/// Unstable votes needed to block a package.
pub const BLOCK_QUORUM: u32 = 5;

/// Vote thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    /// Votes needed for Unstable -> Stable.
    pub stable: u32,
    /// Votes needed for Unstable -> Blocked.
    pub blocked: u32,
}

impl Default for Quorum {
    fn default() -> Self {
        Quorum {
            stable: STABLE_QUORUM,
            blocked: BLOCK_QUORUM,
        }
    }
}

/// A worker's report about one package build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The package built and tested cleanly.
    Stable,
    /// The build or tests failed.
    Unstable,
}

impl Verdict {
    /// State the package moves to once this verdict reaches quorum.
    pub fn target_state(self) -> PackageState {
        match self {
            Verdict::Stable => PackageState::Stable,
            Verdict::Unstable => PackageState::Blocked,
        }
    }
}

/// Result of recording one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Votes of this kind accumulated for the atom, including this one.
    pub votes: u32,
    /// New state, when this vote moved the package.
    pub transitioned: Option<PackageState>,
    /// Whether the package had to be created in the graph.
    pub created: bool,
}

/// Per-atom stable/unstable counters.
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    quorum: Quorum,
    stable: HashMap<Atom, u32>,
    unstable: HashMap<Atom, u32>,
}

impl VoteTally {
    /// Creates an empty tally.
    pub fn new(quorum: Quorum) -> Self {
        VoteTally {
            quorum,
            stable: HashMap::new(),
            unstable: HashMap::new(),
        }
    }

    /// Restores a tally from persisted counters.
    pub fn from_counts(
        quorum: Quorum,
        stable: HashMap<Atom, u32>,
        unstable: HashMap<Atom, u32>,
    ) -> Self {
        VoteTally {
            quorum,
            stable,
            unstable,
        }
    }

    /// The thresholds in force.
    pub fn quorum(&self) -> Quorum {
        self.quorum
    }

    /// Stable votes recorded for `atom`.
    pub fn stable_votes(&self, atom: &str) -> u32 {
        self.stable.get(atom).copied().unwrap_or(0)
    }

    /// Unstable votes recorded for `atom`.
    pub fn unstable_votes(&self, atom: &str) -> u32 {
        self.unstable.get(atom).copied().unwrap_or(0)
    }

    /// All stable counters.
    pub fn stable_counts(&self) -> &HashMap<Atom, u32> {
        &self.stable
    }

    /// All unstable counters.
    pub fn unstable_counts(&self) -> &HashMap<Atom, u32> {
        &self.unstable
    }

    /// Records a vote and applies the quorum rule.
    ///
    /// The package is only touched (and created if unknown) once the
    /// counter reaches its threshold. Stable and Blocked are final: a
    /// package that already left Unstable keeps its state.
    pub fn record(&mut self, graph: &mut PackageGraph, atom: &Atom, verdict: Verdict) -> VoteOutcome {
        let (counters, threshold) = match verdict {
            Verdict::Stable => (&mut self.stable, self.quorum.stable),
            Verdict::Unstable => (&mut self.unstable, self.quorum.blocked),
        };
        let count = counters.entry(atom.clone()).or_insert(0);
        *count = count.saturating_add(1);
        let votes = *count;

        if votes < threshold {
            return VoteOutcome {
                votes,
                transitioned: None,
                created: false,
            };
        }

        let target = verdict.target_state();
        let (id, created) = graph.get_or_create(atom);
        let transitioned = graph.resolve(id, target).then_some(target);
        VoteOutcome {
            votes,
            transitioned,
            created,
        }
    }

    /// Records a stable vote.
    pub fn record_stable(&mut self, graph: &mut PackageGraph, atom: &Atom) -> VoteOutcome {
        self.record(graph, atom, Verdict::Stable)
    }

    /// Records an unstable vote.
    pub fn record_unstable(&mut self, graph: &mut PackageGraph, atom: &Atom) -> VoteOutcome {
        self.record(graph, atom, Verdict::Unstable)
    }
}

//! Leaf selection: which packages can be handed to a worker right now.
//!
//! A package is a leaf when it is Unstable and none of its dependencies is
//! still Unstable. Stable, Blocked and sentinel (ActingStable) dependencies
//! all count as resolved. The two policies split leaves by whether the
//! package has use-flag combinations registered:
//!
//! - [`LeafPolicy::Plain`]: packages with no combinations yet, which still
//!   need their combinations discovered.
//! - [`LeafPolicy::PerCombination`]: packages with at least one combination,
//!   ready to be built under the combination currently under test.
//!
//! Selection among leaves is uniformly random so concurrent pollers spread
//! over the whole frontier instead of piling onto the same package.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::graph::PackageGraph;
use crate::id::NodeId;
use crate::package::Package;

/// Which packages qualify as leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeafPolicy {
    /// Leaves without registered use-flag combinations.
    #[default]
    #[serde(rename = "plain")]
    Plain,
    /// Leaves with at least one registered use-flag combination.
    #[serde(rename = "combination")]
    PerCombination,
}

impl LeafPolicy {
    /// Whether an unblocked Unstable package is emitted under this policy.
    fn admits(self, package: &Package) -> bool {
        match self {
            LeafPolicy::Plain => !package.has_combinations(),
            LeafPolicy::PerCombination => package.has_combinations(),
        }
    }
}

impl fmt::Display for LeafPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafPolicy::Plain => f.write_str("plain"),
            LeafPolicy::PerCombination => f.write_str("combination"),
        }
    }
}

impl FromStr for LeafPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(LeafPolicy::Plain),
            "combination" | "per-combination" | "per_combination" => {
                Ok(LeafPolicy::PerCombination)
            }
            other => Err(format!(
                "invalid leaf policy '{other}', expected plain/combination"
            )),
        }
    }
}

/// Collects every leaf under `policy`, in ascending handle order.
///
/// Walks down from each live node through Unstable dependencies only; a
/// resolved node prunes its whole subtree. Each node is visited once.
pub fn collect_leaves(graph: &PackageGraph, policy: LeafPolicy) -> Vec<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut leaves = Vec::new();

    for root in graph.real_ids() {
        if !visited.insert(root) {
            continue;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let Some(package) = graph.package(node) else {
                continue;
            };
            if !package.state.is_unresolved() {
                continue;
            }

            let mut blocked = false;
            for dep in graph.dependencies(node) {
                let unresolved = graph
                    .package(dep)
                    .is_some_and(|pkg| pkg.state.is_unresolved());
                if unresolved {
                    blocked = true;
                    if visited.insert(dep) {
                        stack.push(dep);
                    }
                }
            }

            if !blocked && policy.admits(package) {
                leaves.push(node);
            }
        }
    }

    leaves.sort_unstable();
    leaves
}

/// Picks one leaf uniformly at random, or `None` when there is no candidate.
pub fn pick_leaf<R: Rng + ?Sized>(
    graph: &PackageGraph,
    policy: LeafPolicy,
    rng: &mut R,
) -> Option<NodeId> {
    collect_leaves(graph, policy).choose(rng).copied()
}

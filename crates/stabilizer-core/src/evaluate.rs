//! Cycle breaking.
//!
//! A dependency cycle would leave every package on it waiting for the others
//! forever. [`break_cycles`] runs a depth-first search from every live node
//! and, whenever an edge leads back to a live node currently on the DFS path,
//! retargets that single edge at a brand-new sentinel copy of the target.
//! Sentinels are terminal and count as resolved, so the rest of the graph
//! becomes schedulable while every live node keeps its identity and state.
//!
//! The search is iterative so deep dependency chains cannot exhaust the
//! thread stack.

use std::collections::{HashMap, HashSet};

use petgraph::graph::EdgeIndex;

use crate::atom::Atom;
use crate::graph::PackageGraph;
use crate::id::NodeId;

/// An edge that closed a cycle and now points at a sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenCycle {
    /// Package whose dependency was rewritten.
    pub parent: Atom,
    /// Atom of the dependency that closed the cycle.
    pub child: Atom,
    /// The sentinel now standing in for `child` on this edge.
    pub sentinel: NodeId,
}

/// One node on the DFS path, with its pending dependency edges.
struct Frame {
    node: NodeId,
    edges: Vec<(EdgeIndex<u32>, NodeId)>,
    next: usize,
}

impl Frame {
    fn enter(graph: &PackageGraph, node: NodeId) -> Self {
        Frame {
            node,
            edges: graph.dependency_edges(node),
            next: 0,
        }
    }
}

/// Makes the graph acyclic by substituting sentinels on back-edges.
///
/// Each offending edge gets its own sentinel, even when several edges close
/// cycles through the same ancestor. Finished nodes are never re-entered,
/// so every edge is examined at most once per pass.
pub fn break_cycles(graph: &mut PackageGraph) -> Vec<BrokenCycle> {
    let mut broken = Vec::new();
    let mut finished: HashSet<NodeId> = HashSet::new();
    // Atom -> node currently on the DFS path for that atom.
    let mut ancestors: HashMap<Atom, NodeId> = HashMap::new();

    for root in graph.real_ids() {
        if finished.contains(&root) {
            continue;
        }
        let Some(root_atom) = graph.package(root).map(|pkg| pkg.atom.clone()) else {
            continue;
        };
        ancestors.insert(root_atom, root);
        let mut stack = vec![Frame::enter(graph, root)];

        while let Some(frame) = stack.last_mut() {
            let Some(&(edge, child)) = frame.edges.get(frame.next) else {
                let done = frame.node;
                stack.pop();
                finished.insert(done);
                if let Some(pkg) = graph.package(done) {
                    ancestors.remove(&pkg.atom);
                }
                continue;
            };
            frame.next += 1;
            let vertex = frame.node;

            // Sentinels have no dependencies and can never close a cycle.
            if !graph.is_live(child) {
                continue;
            }
            let Some(child_atom) = graph.package(child).map(|pkg| pkg.atom.clone()) else {
                continue;
            };

            if ancestors.get(&child_atom) == Some(&child) {
                if let Some(sentinel) = graph.replace_with_sentinel(vertex, edge) {
                    let parent = graph
                        .package(vertex)
                        .map(|pkg| pkg.atom.clone())
                        .unwrap_or_else(|| child_atom.clone());
                    broken.push(BrokenCycle {
                        parent,
                        child: child_atom,
                        sentinel,
                    });
                }
            } else if !finished.contains(&child) {
                ancestors.insert(child_atom, child);
                stack.push(Frame::enter(graph, child));
            }
        }
    }

    #[cfg(debug_assertions)]
    graph.assert_acyclic();

    broken
}

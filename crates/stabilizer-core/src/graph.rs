//! PackageGraph: the arena owning every package node and dependency edge.
//!
//! Nodes live in a petgraph `StableGraph`, so a [`NodeId`] stays valid for the
//! lifetime of the graph. A side index maps each atom to its single *live*
//! node. Sentinel copies created by cycle breaking are stored in the arena
//! but never enter the index, so [`PackageGraph::get_or_create`] always
//! resolves to the live node.
//!
//! Edges point from a package to one of its dependencies and carry an
//! ordinal so the dependency list keeps its insertion order even after an
//! edge is retargeted at a sentinel.

use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::Directed;
use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::error::CoreError;
use crate::evaluate::{break_cycles, BrokenCycle};
use crate::id::NodeId;
use crate::package::{Package, PackageState, UseFlagCombination};

/// Edge weight: position of the dependency in its parent's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub ordinal: u32,
}

/// Result of [`PackageGraph::add_dependency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOutcome {
    /// Number of packages created for the two endpoints (0, 1 or 2).
    pub created: usize,
    /// Whether a new edge was appended (false when it already existed).
    pub inserted: bool,
    /// Edges rewritten by the evaluation pass that followed the insertion.
    pub broken: Vec<BrokenCycle>,
    /// State of the child as seen from the parent after evaluation.
    pub child_state: PackageState,
}

impl DependencyOutcome {
    /// Whether the graph changed and must be persisted.
    pub fn changed(&self) -> bool {
        self.created > 0 || self.inserted
    }
}

/// The dependency graph of real and sentinel packages.
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    graph: StableGraph<Package, Dependency, Directed, u32>,
    /// Atom -> live (non-sentinel) node.
    live: HashMap<Atom, NodeId>,
}

impl PackageGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Returns the underlying petgraph graph.
    pub fn inner(&self) -> &StableGraph<Package, Dependency, Directed, u32> {
        &self.graph
    }

    /// Looks up the live node for `atom`.
    pub fn lookup(&self, atom: &str) -> Option<NodeId> {
        self.live.get(atom).copied()
    }

    /// Returns the live package for `atom`.
    pub fn get(&self, atom: &str) -> Option<&Package> {
        self.lookup(atom).and_then(|id| self.package(id))
    }

    /// Returns any package (live or sentinel) by handle.
    pub fn package(&self, id: NodeId) -> Option<&Package> {
        self.graph.node_weight(id.into())
    }

    /// Whether `id` is the live node for its atom.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.package(id)
            .is_some_and(|pkg| self.live.get(&pkg.atom) == Some(&id))
    }

    /// Handles of all live nodes, in ascending order.
    pub fn real_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.live.values().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All nodes, live and sentinel, in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Package)> {
        self.graph
            .node_indices()
            .map(move |idx| (NodeId::from(idx), &self.graph[idx]))
    }

    /// Total node count, sentinels included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// True when the graph holds no packages.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of live packages.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of sentinel nodes.
    pub fn sentinel_count(&self) -> usize {
        self.graph.node_count() - self.live.len()
    }

    /// Total number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Dependencies of `id`, in insertion order.
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        self.dependency_edges(id)
            .into_iter()
            .map(|(_, target)| target)
            .collect()
    }

    /// Atoms of the dependencies of `id`, in insertion order.
    pub fn dependency_atoms(&self, id: NodeId) -> Vec<&Atom> {
        self.dependencies(id)
            .into_iter()
            .filter_map(|dep| self.package(dep).map(|pkg| &pkg.atom))
            .collect()
    }

    /// Outgoing edges of `id` with their targets, ordered by ordinal.
    pub(crate) fn dependency_edges(&self, id: NodeId) -> Vec<(EdgeIndex<u32>, NodeId)> {
        let idx: NodeIndex<u32> = id.into();
        if !self.graph.contains_node(idx) {
            return Vec::new();
        }
        let mut edges: Vec<(u32, EdgeIndex<u32>, NodeId)> = self
            .graph
            .edges(idx)
            .map(|edge| (edge.weight().ordinal, edge.id(), NodeId::from(edge.target())))
            .collect();
        edges.sort_unstable_by_key(|(ordinal, _, _)| *ordinal);
        edges
            .into_iter()
            .map(|(_, edge, target)| (edge, target))
            .collect()
    }

    /// State of the dependency of `parent` whose atom is `child`, if any.
    pub fn dependency_state(&self, parent: NodeId, child: &str) -> Option<PackageState> {
        self.dependencies(parent)
            .into_iter()
            .filter_map(|dep| self.package(dep))
            .find(|pkg| pkg.atom.as_str() == child)
            .map(|pkg| pkg.state)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Returns the live node for `atom`, creating an Unstable one if absent.
    ///
    /// The boolean is true when the node was created.
    pub fn get_or_create(&mut self, atom: &Atom) -> (NodeId, bool) {
        if let Some(id) = self.lookup(atom.as_str()) {
            return (id, false);
        }
        let id = NodeId::from(self.graph.add_node(Package::unstable(atom.clone())));
        self.live.insert(atom.clone(), id);
        (id, true)
    }

    /// Records that `parent` depends on `child`, then re-normalizes the graph.
    ///
    /// Idempotent: when `parent` already lists a dependency with `child`'s
    /// atom (live or sentinel), nothing is appended and no evaluation runs.
    pub fn add_dependency(&mut self, parent: &Atom, child: &Atom) -> DependencyOutcome {
        let (parent_id, parent_created) = self.get_or_create(parent);
        let (child_id, child_created) = self.get_or_create(child);
        let created = usize::from(parent_created) + usize::from(child_created);

        let inserted = self.link(parent_id, child_id);
        let broken = if inserted {
            break_cycles(self)
        } else {
            Vec::new()
        };

        let child_state = self
            .dependency_state(parent_id, child.as_str())
            .or_else(|| self.package(child_id).map(|pkg| pkg.state))
            .unwrap_or(PackageState::Unstable);

        DependencyOutcome {
            created,
            inserted,
            broken,
            child_state,
        }
    }

    /// Appends `child` to `parent`'s dependencies unless its atom is present.
    fn link(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(child_atom) = self.package(child).map(|pkg| pkg.atom.as_str()) else {
            return false;
        };
        if self.dependency_state(parent, child_atom).is_some() {
            return false;
        }
        let ordinal = self.graph.edges(parent.into()).count() as u32;
        self.graph
            .add_edge(parent.into(), child.into(), Dependency { ordinal });
        true
    }

    /// Sets the state of the live package for `atom`, creating it if needed.
    ///
    /// The sentinel state cannot be assigned; sentinels only come from cycle
    /// breaking. Returns whether the package was created.
    pub fn set_state(&mut self, atom: &Atom, state: PackageState) -> Result<bool, CoreError> {
        if state.is_sentinel() {
            return Err(CoreError::Integrity {
                reason: format!("cannot assign acting-stable state to '{atom}'"),
            });
        }
        let (id, created) = self.get_or_create(atom);
        if let Some(pkg) = self.graph.node_weight_mut(id.into()) {
            pkg.state = state;
        }
        Ok(created)
    }

    /// Moves a live package from Unstable to `state`.
    ///
    /// Stable and Blocked are final as far as voting is concerned, so a
    /// package that already left Unstable is left untouched. Returns whether
    /// the state changed.
    pub(crate) fn resolve(&mut self, id: NodeId, state: PackageState) -> bool {
        match self.graph.node_weight_mut(id.into()) {
            Some(pkg) if pkg.state.is_unresolved() && !state.is_sentinel() => {
                pkg.state = state;
                true
            }
            _ => false,
        }
    }

    /// Appends a use-flag combination to the live package for `atom`.
    ///
    /// Returns whether the package was created.
    pub fn add_combination(&mut self, atom: &Atom, combination: UseFlagCombination) -> bool {
        let (id, created) = self.get_or_create(atom);
        if let Some(pkg) = self.graph.node_weight_mut(id.into()) {
            pkg.combinations.push(combination);
        }
        created
    }

    /// Retargets `edge` (owned by `parent`) at a fresh sentinel copy of its
    /// current target. The sentinel is not indexed by atom.
    pub(crate) fn replace_with_sentinel(
        &mut self,
        parent: NodeId,
        edge: EdgeIndex<u32>,
    ) -> Option<NodeId> {
        let (_, target) = self.graph.edge_endpoints(edge)?;
        let ordinal = self.graph.edge_weight(edge)?.ordinal;
        let atom = self.graph.node_weight(target)?.atom.clone();

        self.graph.remove_edge(edge);
        let sentinel = self.graph.add_node(Package::sentinel(atom));
        self.graph
            .add_edge(parent.into(), sentinel, Dependency { ordinal });
        Some(NodeId::from(sentinel))
    }

    // -----------------------------------------------------------------------
    // Restoration (used by the storage layer)
    // -----------------------------------------------------------------------

    /// Adds a restored package node as-is.
    ///
    /// Live packages are indexed by atom; a second live package with the
    /// same atom is rejected.
    pub fn push_package(&mut self, package: Package) -> Result<NodeId, CoreError> {
        let sentinel = package.is_sentinel();
        if !sentinel && self.live.contains_key(&package.atom) {
            return Err(CoreError::Integrity {
                reason: format!("duplicate live package '{}'", package.atom),
            });
        }
        let atom = package.atom.clone();
        let id = NodeId::from(self.graph.add_node(package));
        if !sentinel {
            self.live.insert(atom, id);
        }
        Ok(id)
    }

    /// Appends a restored dependency edge.
    ///
    /// Sentinels never have dependencies, and a node may not list the same
    /// node twice.
    pub fn push_dependency(&mut self, parent: NodeId, child: NodeId) -> Result<(), CoreError> {
        let parent_pkg = self
            .package(parent)
            .ok_or(CoreError::NodeNotFound { id: parent })?;
        if parent_pkg.is_sentinel() {
            return Err(CoreError::Integrity {
                reason: format!("sentinel '{}' cannot have dependencies", parent_pkg.atom),
            });
        }
        if self.package(child).is_none() {
            return Err(CoreError::NodeNotFound { id: child });
        }
        if self.dependencies(parent).contains(&child) {
            return Err(CoreError::Integrity {
                reason: format!("duplicate dependency edge {parent} -> {child}"),
            });
        }
        let ordinal = self.graph.edges(parent.into()).count() as u32;
        self.graph
            .add_edge(parent.into(), child.into(), Dependency { ordinal });
        Ok(())
    }

    /// True when no dependency path leads from a node back to itself.
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Panics if the graph contains a cycle.
    ///
    /// Only compiled into debug builds; an evaluation pass that leaves a
    /// cycle behind is a programming error.
    #[cfg(debug_assertions)]
    pub(crate) fn assert_acyclic(&self) {
        assert!(
            self.is_acyclic(),
            "dependency graph still cyclic after evaluation"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> Atom {
        Atom::new(s).unwrap()
    }

    #[test]
    fn get_or_create_returns_same_node() {
        let mut graph = PackageGraph::new();
        let (a, created) = graph.get_or_create(&atom("a/b-1"));
        assert!(created);
        let (again, created) = graph.get_or_create(&atom("a/b-1"));
        assert!(!created);
        assert_eq!(a, again);
        assert_eq!(graph.get("a/b-1").unwrap().state, PackageState::Unstable);
    }

    #[test]
    fn add_dependency_is_idempotent() {
        let mut graph = PackageGraph::new();
        let first = graph.add_dependency(&atom("a/b-1"), &atom("a/c-1"));
        assert_eq!(first.created, 2);
        assert!(first.inserted);
        assert_eq!(first.child_state, PackageState::Unstable);

        let second = graph.add_dependency(&atom("a/b-1"), &atom("a/c-1"));
        assert_eq!(second.created, 0);
        assert!(!second.inserted);
        assert!(!second.changed());
        assert_eq!(second.child_state, PackageState::Unstable);

        let parent = graph.lookup("a/b-1").unwrap();
        assert_eq!(graph.dependencies(parent).len(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn dependencies_keep_insertion_order() {
        let mut graph = PackageGraph::new();
        for child in ["x/z-1", "x/a-1", "x/m-1"] {
            graph.add_dependency(&atom("x/root-1"), &atom(child));
        }
        let root = graph.lookup("x/root-1").unwrap();
        let atoms: Vec<&str> = graph
            .dependency_atoms(root)
            .into_iter()
            .map(Atom::as_str)
            .collect();
        assert_eq!(atoms, vec!["x/z-1", "x/a-1", "x/m-1"]);
    }

    #[test]
    fn direct_cycle_is_broken_with_sentinel() {
        let mut graph = PackageGraph::new();
        graph.add_dependency(&atom("a/x-1"), &atom("a/y-1"));
        let outcome = graph.add_dependency(&atom("a/y-1"), &atom("a/x-1"));

        assert_eq!(outcome.broken.len(), 1);
        assert_eq!(outcome.child_state, PackageState::ActingStable);
        assert_eq!(graph.sentinel_count(), 1);
        assert!(!petgraph::algo::is_cyclic_directed(graph.inner()));

        // The live node is still what lookup returns.
        let live_x = graph.lookup("a/x-1").unwrap();
        assert_eq!(graph.package(live_x).unwrap().state, PackageState::Unstable);
        let sentinel = outcome.broken[0].sentinel;
        assert_ne!(sentinel, live_x);
        assert!(!graph.is_live(sentinel));
    }

    #[test]
    fn self_dependency_becomes_sentinel_edge() {
        let mut graph = PackageGraph::new();
        let outcome = graph.add_dependency(&atom("a/x-1"), &atom("a/x-1"));
        assert!(outcome.inserted);
        assert_eq!(outcome.child_state, PackageState::ActingStable);
        assert!(!petgraph::algo::is_cyclic_directed(graph.inner()));
    }

    #[test]
    fn sentinel_copy_blocks_duplicate_edge() {
        let mut graph = PackageGraph::new();
        graph.add_dependency(&atom("a/x-1"), &atom("a/y-1"));
        graph.add_dependency(&atom("a/y-1"), &atom("a/x-1"));
        // y already lists x (as a sentinel copy); adding again is a no-op.
        let again = graph.add_dependency(&atom("a/y-1"), &atom("a/x-1"));
        assert!(!again.inserted);
        assert_eq!(again.child_state, PackageState::ActingStable);
        assert_eq!(graph.sentinel_count(), 1);
    }

    #[test]
    fn set_state_rejects_sentinel_state() {
        let mut graph = PackageGraph::new();
        assert!(graph
            .set_state(&atom("a/b-1"), PackageState::ActingStable)
            .is_err());
        assert!(graph.set_state(&atom("a/b-1"), PackageState::Stable).unwrap());
        assert_eq!(graph.get("a/b-1").unwrap().state, PackageState::Stable);
    }

    #[test]
    fn resolve_only_moves_unstable_packages() {
        let mut graph = PackageGraph::new();
        let (id, _) = graph.get_or_create(&atom("a/b-1"));
        assert!(graph.resolve(id, PackageState::Stable));
        assert!(!graph.resolve(id, PackageState::Blocked));
        assert_eq!(graph.package(id).unwrap().state, PackageState::Stable);
    }

    #[test]
    fn add_combination_appends_in_order() {
        let mut graph = PackageGraph::new();
        assert!(graph.add_combination(&atom("a/b-1"), UseFlagCombination::parse("ssl")));
        assert!(!graph.add_combination(&atom("a/b-1"), UseFlagCombination::parse("-ssl")));
        let pkg = graph.get("a/b-1").unwrap();
        assert_eq!(pkg.combinations.len(), 2);
        assert_eq!(pkg.combinations[1].to_string(), "-ssl");
    }

    #[test]
    fn push_package_rejects_duplicate_live_atom() {
        let mut graph = PackageGraph::new();
        graph.push_package(Package::unstable(atom("a/b-1"))).unwrap();
        graph.push_package(Package::sentinel(atom("a/b-1"))).unwrap();
        assert!(matches!(
            graph.push_package(Package::unstable(atom("a/b-1"))),
            Err(CoreError::Integrity { .. })
        ));
    }

    #[test]
    fn push_dependency_rejects_sentinel_parent() {
        let mut graph = PackageGraph::new();
        let live = graph.push_package(Package::unstable(atom("a/b-1"))).unwrap();
        let sentinel = graph.push_package(Package::sentinel(atom("a/c-1"))).unwrap();
        assert!(graph.push_dependency(sentinel, live).is_err());
        graph.push_dependency(live, sentinel).unwrap();
        assert!(graph.push_dependency(live, sentinel).is_err());
        assert!(matches!(
            graph.push_dependency(live, NodeId(99)),
            Err(CoreError::NodeNotFound { .. })
        ));
    }
}

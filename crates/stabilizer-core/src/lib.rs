//! Dependency-graph engine for distributed package stabilization.
//!
//! Packages form a dependency graph; a package can only be tested once all
//! of its dependencies are resolved. This crate holds the in-memory model and
//! the algorithms that keep it schedulable:
//!
//! - [`graph`]: the [`PackageGraph`] arena of real and sentinel packages
//! - [`evaluate`]: cycle breaking via sentinel substitution
//! - [`leaves`]: leaf selection under the two dispatch policies
//! - [`votes`]: quorum-based state transitions
//! - [`priority`]: the round-robin priority override queue
//! - [`codec`]: the URL-safe wire encoding of atoms
//!
//! Nothing in this crate performs I/O. Persistence lives in
//! `stabilizer-storage`; the network surface lives in `stabilizer-server`.

pub mod atom;
pub mod codec;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod id;
pub mod leaves;
pub mod package;
pub mod priority;
pub mod state;
pub mod votes;

// Re-export commonly used types
pub use atom::Atom;
pub use error::CoreError;
pub use evaluate::{break_cycles, BrokenCycle};
pub use graph::{DependencyOutcome, PackageGraph};
pub use id::{NodeId, TicketId};
pub use leaves::{collect_leaves, pick_leaf, LeafPolicy};
pub use package::{Package, PackageState, UseFlagCombination};
pub use priority::{PriorityEntry, PriorityQueue};
pub use state::{StabilizationState, WorkItem};
pub use votes::{Quorum, Verdict, VoteOutcome, VoteTally};

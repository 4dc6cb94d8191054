//! Core error types for stabilizer-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Unknown atoms
//! are never an error anywhere in the engine: lookups upgrade to creation.

use thiserror::Error;

use crate::id::NodeId;

/// Core errors produced by the stabilizer-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The wire encoding of an atom could not be decoded.
    #[error("invalid atom encoding: {reason}")]
    InvalidEncoding { reason: String },

    /// A decoded atom is empty or contains whitespace.
    #[error("invalid atom: '{atom}'")]
    InvalidAtom { atom: String },

    /// A persisted state code is outside `0..=3`.
    #[error("unknown package state code: {code}")]
    UnknownState { code: i64 },

    /// A node handle does not refer to a package in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// Restored data violates a graph invariant.
    #[error("graph integrity violation: {reason}")]
    Integrity { reason: String },
}

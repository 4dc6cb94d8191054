//! Stable handle newtypes.
//!
//! [`NodeId`] is the arena handle of a package node. Cycle detection compares
//! handles, never addresses, so a sentinel copy of an atom is always
//! distinguishable from the live node that shares its atom.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable node identifier. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// External issue-tracker ticket that asked for a package to be prioritized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub u64);

impl TicketId {
    /// Placeholder for entries persisted without a ticket number.
    pub const UNKNOWN: TicketId = TicketId(0);

    /// Whether this names a real ticket.
    pub fn is_known(self) -> bool {
        self != TicketId::UNKNOWN
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// Bridge between NodeId and petgraph's NodeIndex<u32>.

impl From<NodeIndex<u32>> for NodeId {
    fn from(idx: NodeIndex<u32>) -> Self {
        NodeId(idx.index() as u32)
    }
}

impl From<NodeId> for NodeIndex<u32> {
    fn from(id: NodeId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_to_node_index_roundtrip() {
        let idx = NodeIndex::<u32>::new(42);
        let node_id = NodeId::from(idx);
        assert_eq!(node_id.0, 42);

        let back: NodeIndex<u32> = node_id.into();
        assert_eq!(back.index(), 42);
    }

    #[test]
    fn ticket_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&TicketId(581234)).unwrap();
        assert_eq!(json, "581234");
        assert_eq!(format!("{}", TicketId(7)), "#7");
        assert!(TicketId(7).is_known());
        assert!(!TicketId::UNKNOWN.is_known());
    }
}

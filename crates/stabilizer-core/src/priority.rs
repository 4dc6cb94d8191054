//! Priority override queue.
//!
//! Operators can pin packages tied to a tracker ticket. Pinned packages are
//! handed out ahead of any leaf, round-robin: the head entry is returned and
//! moved to the back, so several pinned packages share the workers evenly.
//! An entry leaves the queue only when a result is reported for its atom.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::id::TicketId;

/// A pinned package and the ticket it was pinned for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub atom: Atom,
    pub ticket: TicketId,
}

/// Round-robin queue of [`PriorityEntry`]s.
#[derive(Debug, Clone, Default)]
pub struct PriorityQueue {
    entries: VecDeque<PriorityEntry>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a queue in the given order, dropping repeated pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = PriorityEntry>) -> Self {
        let mut queue = PriorityQueue::new();
        for entry in entries {
            queue.enqueue(entry.atom, entry.ticket);
        }
        queue
    }

    /// Appends an entry. Returns false if the same (atom, ticket) is queued.
    pub fn enqueue(&mut self, atom: Atom, ticket: TicketId) -> bool {
        if self
            .entries
            .iter()
            .any(|e| e.atom == atom && e.ticket == ticket)
        {
            return false;
        }
        self.entries.push_back(PriorityEntry { atom, ticket });
        true
    }

    /// Returns the head entry and moves it to the back.
    pub fn rotate(&mut self) -> Option<PriorityEntry> {
        let head = self.entries.pop_front()?;
        self.entries.push_back(head.clone());
        Some(head)
    }

    /// Removes the first entry for `atom`, returning its ticket.
    pub fn retire(&mut self, atom: &str) -> Option<TicketId> {
        let pos = self.entries.iter().position(|e| e.atom.as_str() == atom)?;
        self.entries.remove(pos).map(|e| e.ticket)
    }

    /// First queued ticket for `atom`, without removing it.
    pub fn ticket_for(&self, atom: &str) -> Option<TicketId> {
        self.entries
            .iter()
            .find(|e| e.atom.as_str() == atom)
            .map(|e| e.ticket)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &PriorityEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> Atom {
        Atom::new(s).unwrap()
    }

    #[test]
    fn rotates_round_robin() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(atom("p/a-1"), TicketId(1));
        queue.enqueue(atom("p/b-1"), TicketId(2));

        let order: Vec<String> = (0..4)
            .map(|_| queue.rotate().unwrap().atom.to_string())
            .collect();
        assert_eq!(order, vec!["p/a-1", "p/b-1", "p/a-1", "p/b-1"]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let mut queue = PriorityQueue::new();
        assert!(queue.rotate().is_none());
        assert!(queue.retire("p/a-1").is_none());
    }

    #[test]
    fn duplicate_pair_is_ignored() {
        let mut queue = PriorityQueue::new();
        assert!(queue.enqueue(atom("p/a-1"), TicketId(1)));
        assert!(!queue.enqueue(atom("p/a-1"), TicketId(1)));
        assert!(queue.enqueue(atom("p/a-1"), TicketId(9)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn retire_removes_first_match_only() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(atom("p/a-1"), TicketId(1));
        queue.enqueue(atom("p/b-1"), TicketId(2));
        queue.enqueue(atom("p/a-1"), TicketId(3));

        assert_eq!(queue.retire("p/a-1"), Some(TicketId(1)));
        assert_eq!(queue.ticket_for("p/a-1"), Some(TicketId(3)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.retire("p/zzz-1"), None);
    }

    #[test]
    fn from_entries_keeps_order() {
        let queue = PriorityQueue::from_entries(vec![
            PriorityEntry { atom: atom("p/b-1"), ticket: TicketId(2) },
            PriorityEntry { atom: atom("p/a-1"), ticket: TicketId(1) },
            PriorityEntry { atom: atom("p/b-1"), ticket: TicketId(2) },
        ]);
        let atoms: Vec<&str> = queue.iter().map(|e| e.atom.as_str()).collect();
        assert_eq!(atoms, vec!["p/b-1", "p/a-1"]);
    }
}

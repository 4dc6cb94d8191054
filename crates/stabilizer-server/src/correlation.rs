//! Pending correlations between verdict reports and log submissions.
//!
//! A worker reports its verdict with a per-dispatch id, then uploads the
//! build log with the same id. The table remembers which atom and target
//! state each id stood for until the log arrives. Entries live in memory
//! only; a restart forgets them.
//!
//! Ids are chosen by callers and a verdict may never be followed by a log,
//! so the table is capped. Registering a new id at the cap evicts the
//! oldest entry.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use stabilizer_core::{Atom, PackageState};

/// Entry cap used by [`CorrelationTable::new`].
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// What a correlation id refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCorrelation {
    pub atom: Atom,
    /// Stable or Blocked, depending on the reported verdict.
    pub state: PackageState,
}

/// Concurrent id -> [`PendingCorrelation`] map, bounded in size.
#[derive(Debug)]
pub struct CorrelationTable {
    /// Values carry their registration sequence number.
    pending: DashMap<String, (u64, PendingCorrelation)>,
    next_seq: AtomicU64,
    max_pending: usize,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING)
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding at most `max_pending` entries (at least one).
    pub fn with_limit(max_pending: usize) -> Self {
        CorrelationTable {
            pending: DashMap::new(),
            next_seq: AtomicU64::new(0),
            max_pending: max_pending.max(1),
        }
    }

    /// Records `id`, replacing an earlier entry with the same id.
    pub fn register(&self, id: impl Into<String>, atom: Atom, state: PackageState) {
        let id = id.into();
        if !self.pending.contains_key(&id) {
            while self.pending.len() >= self.max_pending {
                if !self.evict_oldest() {
                    break;
                }
            }
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.pending
            .insert(id, (seq, PendingCorrelation { atom, state }));
    }

    /// Removes and returns the entry for `id`.
    pub fn take(&self, id: &str) -> Option<PendingCorrelation> {
        self.pending.remove(id).map(|(_, (_, pending))| pending)
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .pending
            .iter()
            .min_by_key(|entry| entry.value().0)
            .map(|entry| entry.key().clone());
        let Some(id) = oldest else {
            return false;
        };
        if let Some((id, (_, pending))) = self.pending.remove(&id) {
            tracing::warn!(id = %id, atom = %pending.atom, "correlation table full, dropped oldest entry");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

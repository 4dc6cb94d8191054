//! In-memory implementation of [`GraphStore`].
//!
//! [`InMemoryStore`] keeps the last saved snapshot in memory. Clones share
//! the same storage, so a test can hand one clone to the service and keep
//! another to inspect what was persisted.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StorageError;
use crate::snapshot::Snapshot;
use crate::traits::GraphStore;

#[derive(Debug, Default)]
struct Inner {
    snapshot: Option<Snapshot>,
    saves: usize,
}

/// Non-durable [`GraphStore`] for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = InMemoryStore::new();
        store.lock().snapshot = Some(snapshot);
        store
    }

    /// Number of saves performed through any clone.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// The last saved snapshot.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.lock().snapshot.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GraphStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        Ok(self.lock().snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.snapshot = Some(snapshot.clone());
        inner.saves += 1;
        Ok(())
    }
}

//! The [`GraphStore`] trait defining the load/save contract.
//!
//! Two-layer API design:
//! - **Snapshot** methods (`load`, `save`) are what each backend implements.
//! - **State** convenience methods (`load_state`, `save_state`) wrap them
//!   with [`decompose`]/[`recompose`] so callers never touch records.
//!
//! Every save is a full overwrite and must be durable before it returns.

use stabilizer_core::{Quorum, StabilizationState};

use crate::convert::{decompose, recompose};
use crate::error::StorageError;
use crate::snapshot::Snapshot;

/// The storage contract for the stabilization state.
pub trait GraphStore {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Reads the last saved snapshot, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<Snapshot>, StorageError>;

    /// Replaces the stored snapshot.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError>;

    // -------------------------------------------------------------------
    // High-level convenience methods
    // -------------------------------------------------------------------

    /// Loads and rebuilds the state.
    fn load_state(&self, quorum: Quorum) -> Result<Option<StabilizationState>, StorageError> {
        match self.load()? {
            Some(snapshot) => recompose(snapshot, quorum).map(Some),
            None => Ok(None),
        }
    }

    /// Flattens and saves the state.
    fn save_state(&mut self, state: &StabilizationState) -> Result<(), StorageError> {
        self.save(&decompose(state))
    }
}

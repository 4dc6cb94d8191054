//! Storage error types for stabilizer-storage.
//!
//! [`StorageError`] covers every failure mode of the storage layer. Callers
//! in the server treat any of them during a save as fatal.

use stabilizer_core::CoreError;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a snapshot file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A SQLite statement failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A data integrity violation was detected.
    #[error("integrity error: {reason}")]
    Integrity { reason: String },

    /// Failed to rebuild the graph from stored data.
    #[error("reconstruction error: {reason}")]
    Reconstruction { reason: String },

    /// The core model rejected restored data.
    #[error(transparent)]
    Core(#[from] CoreError),
}

//! Storage for the stabilization graph.
//!
//! Provides the [`GraphStore`] trait, the load/save contract every backend
//! implements, plus three interchangeable backends:
//!
//! - [`JsonFileStore`]: a folder of flat JSON files (`database`, `stable`,
//!   `unstable`, `priority`)
//! - [`SqliteStore`]: one row per real package, sentinels stored inline on
//!   the dependency rows that point at them
//! - [`InMemoryStore`]: no durability, for tests and ephemeral runs
//!
//! # Architecture
//!
//! All backends exchange a [`Snapshot`]: the flat, index-based record format
//! of the JSON files. [`convert::decompose`] flattens a
//! [`StabilizationState`](stabilizer_core::StabilizationState) into a
//! snapshot and [`convert::recompose`] rebuilds it, validating every index
//! and invariant on the way in.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`snapshot`]: the persisted record types
//! - [`traits`]: GraphStore trait definition
//! - [`convert`]: decompose/recompose functions
//! - [`json`]: JsonFileStore implementation
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: migration setup for the SQLite backend
//! - [`sqlite`]: SqliteStore implementation

pub mod convert;
pub mod error;
pub mod json;
pub mod memory;
pub mod schema;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use convert::{decompose, recompose};
pub use error::StorageError;
pub use json::JsonFileStore;
pub use memory::InMemoryStore;
pub use snapshot::{PackageRecord, PriorityRecord, Snapshot};
pub use sqlite::SqliteStore;
pub use traits::GraphStore;

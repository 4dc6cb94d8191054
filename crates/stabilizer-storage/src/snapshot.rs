//! Persisted record types.
//!
//! A [`Snapshot`] is the whole persisted state. Its `packages` list is the
//! `database` file: every node, sentinels included, with dependencies given
//! as indices into the same list. Field names match the files written by
//! earlier deployments so existing data folders load unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of the persisted graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    #[serde(rename = "Cpv")]
    pub cpv: String,
    /// Dependencies as positions in [`Snapshot::packages`], in order.
    #[serde(rename = "Indices", default)]
    pub indices: Vec<usize>,
    /// Registered use-flag combinations.
    #[serde(rename = "UseFlags", default, skip_serializing_if = "Vec::is_empty")]
    pub use_flags: Vec<Vec<String>>,
    /// Index of the combination under test.
    #[serde(rename = "NumStable", default, skip_serializing_if = "is_zero")]
    pub num_stable: usize,
    /// State code, `0..=3`.
    #[serde(rename = "State")]
    pub state: i64,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// One pinned package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRecord {
    #[serde(rename = "Cpv")]
    pub cpv: String,
    /// Older `priority` files carry no ticket; those entries load as 0.
    #[serde(rename = "TicketId", default)]
    pub ticket: u64,
}

/// Everything a backend persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub packages: Vec<PackageRecord>,
    /// Stable vote counters by atom.
    pub stable: BTreeMap<String, u32>,
    /// Unstable vote counters by atom.
    pub unstable: BTreeMap<String, u32>,
    /// Priority queue in dispatch order.
    pub priority: Vec<PriorityRecord>,
}

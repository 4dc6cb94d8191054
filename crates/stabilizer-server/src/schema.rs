//! Request parameter and response types for the HTTP API.
//!
//! Every parameter defaults to empty so a missing one reaches the handler
//! and is answered like a malformed one, with `-1`.

use serde::{Deserialize, Serialize};

/// `GET /sched-dep`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedDepParams {
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub dependency: String,
}

/// `GET /mark-stable`, `GET /mark-blocked`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteParams {
    #[serde(default)]
    pub package: String,
    /// Correlation id for the log submission that follows.
    #[serde(default)]
    pub id: Option<String>,
}

/// `GET /request-package`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestWorkParams {
    /// `plain` or `combination`; the server default when absent.
    #[serde(default)]
    pub policy: Option<String>,
}

/// `POST /submit-log` form body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitLogForm {
    #[serde(default)]
    pub id: String,
    /// Base64-encoded log contents.
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub filename: String,
}

/// `GET /add-package`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageParams {
    #[serde(default)]
    pub package: String,
}

/// `GET /add-combo`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComboParams {
    #[serde(default)]
    pub package: String,
    /// Space-separated flag list.
    #[serde(default)]
    pub flags: String,
}

/// `GET /prioritize`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrioritizeParams {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub ticket: String,
}

/// `GET /status` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub backend: String,
    pub packages: usize,
    pub stable: usize,
    pub unstable: usize,
    pub blocked: usize,
    pub sentinels: usize,
    pub with_combinations: usize,
    pub dependencies: usize,
    pub priority: usize,
    pub pending_correlations: usize,
}

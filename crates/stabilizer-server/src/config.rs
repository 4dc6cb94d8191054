//! Server configuration read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `STABILIZER_ADDR` | `0.0.0.0:8080` |
//! | `STABILIZER_BACKEND` | `json` (`json`, `sqlite`, `memory`) |
//! | `STABILIZER_DATA` | `data` |
//! | `STABILIZER_LOG_DIR` | `logs` |
//! | `STABILIZER_POLICY` | `plain` (`plain`, `combination`) |
//! | `STABILIZER_STABLE_QUORUM` | `2` |
//! | `STABILIZER_BLOCK_QUORUM` | `5` |
//! | `STABILIZER_MAX_LOG_BYTES` | `200000000` |
//! | `STABILIZER_MAX_PENDING` | `10000` |
//! | `STABILIZER_TRACKER_URL` | unset: results are only logged |
//! | `STABILIZER_TRACKER_KEY` | unset |
//! | `STABILIZER_SEED` | unset: leaf selection seeded from entropy |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use stabilizer_core::{LeafPolicy, Quorum};

use crate::correlation::DEFAULT_MAX_PENDING;

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {var}: '{value}' ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Persistence backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Json,
    Sqlite,
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Backend::Json),
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            _ => Err("expected json, sqlite or memory".to_string()),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Json => "json",
            Backend::Sqlite => "sqlite",
            Backend::Memory => "memory",
        })
    }
}

/// Issue-tracker endpoint for result comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub url: String,
    pub api_key: Option<String>,
}

/// Everything the server reads at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub backend: Backend,
    /// JSON data folder, or SQLite database file.
    pub data: PathBuf,
    pub log_dir: PathBuf,
    pub policy: LeafPolicy,
    pub quorum: Quorum,
    pub max_log_bytes: usize,
    /// Cap on verdicts waiting for their build log.
    pub max_pending: usize,
    pub tracker: Option<TrackerConfig>,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "0.0.0.0:8080".to_string(),
            backend: Backend::Json,
            data: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
            policy: LeafPolicy::Plain,
            quorum: Quorum::default(),
            max_log_bytes: 200_000_000,
            max_pending: DEFAULT_MAX_PENDING,
            tracker: None,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup`; unset or empty variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = ServerConfig::default();

        if let Some(addr) = get("STABILIZER_ADDR") {
            config.addr = addr;
        }
        if let Some(backend) = parse(&get, "STABILIZER_BACKEND")? {
            config.backend = backend;
        }
        if let Some(data) = get("STABILIZER_DATA") {
            config.data = PathBuf::from(data);
        }
        if let Some(dir) = get("STABILIZER_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(policy) = parse(&get, "STABILIZER_POLICY")? {
            config.policy = policy;
        }
        if let Some(stable) = parse_quorum(&get, "STABILIZER_STABLE_QUORUM")? {
            config.quorum.stable = stable;
        }
        if let Some(blocked) = parse_quorum(&get, "STABILIZER_BLOCK_QUORUM")? {
            config.quorum.blocked = blocked;
        }
        if let Some(max) = parse(&get, "STABILIZER_MAX_LOG_BYTES")? {
            config.max_log_bytes = max;
        }
        if let Some(max) = parse(&get, "STABILIZER_MAX_PENDING")? {
            config.max_pending = max;
        }
        if let Some(url) = get("STABILIZER_TRACKER_URL") {
            config.tracker = Some(TrackerConfig {
                url: url.trim_end_matches('/').to_string(),
                api_key: get("STABILIZER_TRACKER_KEY"),
            });
        }
        config.seed = parse(&get, "STABILIZER_SEED")?;

        Ok(config)
    }
}

fn parse<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_quorum<G>(get: &G, var: &'static str) -> Result<Option<u32>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse::<u32, G>(get, var)? {
        Some(0) => Err(ConfigError {
            var,
            value: "0".to_string(),
            reason: "quorum must be at least 1".to_string(),
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.quorum, Quorum { stable: 2, blocked: 5 });
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("STABILIZER_ADDR", "127.0.0.1:9000"),
            ("STABILIZER_BACKEND", "sqlite"),
            ("STABILIZER_DATA", "/var/lib/stabilizer/graph.db"),
            ("STABILIZER_LOG_DIR", "/var/log/builds"),
            ("STABILIZER_POLICY", "combination"),
            ("STABILIZER_STABLE_QUORUM", "3"),
            ("STABILIZER_BLOCK_QUORUM", "7"),
            ("STABILIZER_MAX_LOG_BYTES", "1024"),
            ("STABILIZER_MAX_PENDING", "64"),
            ("STABILIZER_TRACKER_URL", "https://bugs.example.org/rest/"),
            ("STABILIZER_TRACKER_KEY", "secret"),
            ("STABILIZER_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.data, PathBuf::from("/var/lib/stabilizer/graph.db"));
        assert_eq!(config.policy, LeafPolicy::PerCombination);
        assert_eq!(config.quorum, Quorum { stable: 3, blocked: 7 });
        assert_eq!(config.max_log_bytes, 1024);
        assert_eq!(config.max_pending, 64);
        let tracker = config.tracker.unwrap();
        assert_eq!(tracker.url, "https://bugs.example.org/rest");
        assert_eq!(tracker.api_key.as_deref(), Some("secret"));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = config(&[("STABILIZER_BACKEND", "postgres")]).unwrap_err();
        assert_eq!(err.var, "STABILIZER_BACKEND");
        assert!(config(&[("STABILIZER_STABLE_QUORUM", "two")]).is_err());
        assert!(config(&[("STABILIZER_BLOCK_QUORUM", "0")]).is_err());
        assert!(config(&[("STABILIZER_POLICY", "random")]).is_err());
    }

    #[test]
    fn empty_values_keep_defaults() {
        let config = config(&[("STABILIZER_BACKEND", "  "), ("STABILIZER_SEED", "")]).unwrap();
        assert_eq!(config.backend, Backend::Json);
        assert_eq!(config.seed, None);
    }
}

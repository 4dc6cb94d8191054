//! Application state shared by all handlers.
//!
//! [`AppState`] wraps the service in `Arc<tokio::sync::Mutex<>>` so handlers
//! await the lock without blocking the tokio runtime. A `RwLock` is not an
//! option: leaf selection advances the service RNG and rotates the priority
//! queue, so every call needs exclusive access, and the SQLite connection
//! inside the store is `!Sync`.
//!
//! The correlation table, log archive and reporter live outside the lock;
//! log writes and tracker calls never hold up graph mutations.

use std::path::PathBuf;
use std::sync::Arc;

use stabilizer_storage::{GraphStore, InMemoryStore, JsonFileStore, SqliteStore};

use crate::config::{Backend, ServerConfig};
use crate::correlation::CorrelationTable;
use crate::error::ApiError;
use crate::logs::LogArchive;
use crate::reporter::Reporter;
use crate::service::StabilizationService;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The shared service (async Mutex, non-blocking await).
    pub service: Arc<tokio::sync::Mutex<StabilizationService>>,
    /// Verdicts waiting for their build log.
    pub correlations: Arc<CorrelationTable>,
    pub logs: Arc<LogArchive>,
    pub reporter: Arc<Reporter>,
    /// Request body limit, sized for base64-encoded build logs.
    pub max_log_bytes: usize,
}

impl AppState {
    /// Opens the backend selected by `config`.
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        match config.backend {
            Backend::Json => Self::with_store(JsonFileStore::new(&config.data), config),
            Backend::Sqlite => {
                if let Some(parent) = config.data.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Self::with_store(SqliteStore::open(&config.data)?, config)
            }
            Backend::Memory => Self::with_store(InMemoryStore::new(), config),
        }
    }

    /// Builds the state around an already opened store.
    pub fn with_store<S>(store: S, config: &ServerConfig) -> Result<Self, ApiError>
    where
        S: GraphStore + Send + 'static,
    {
        let service = StabilizationService::open(store, config)?;
        Ok(AppState {
            service: Arc::new(tokio::sync::Mutex::new(service)),
            correlations: Arc::new(CorrelationTable::with_limit(config.max_pending)),
            logs: Arc::new(LogArchive::new(&config.log_dir)),
            reporter: Arc::new(Reporter::from_config(config.tracker.as_ref())),
            max_log_bytes: config.max_log_bytes,
        })
    }

    /// Non-durable state writing logs to `log_dir` (for testing).
    pub fn in_memory(log_dir: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let config = ServerConfig {
            backend: Backend::Memory,
            log_dir: log_dir.into(),
            seed: Some(0),
            ..ServerConfig::default()
        };
        Self::with_store(InMemoryStore::new(), &config)
    }
}

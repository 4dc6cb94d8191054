//! Binary entrypoint for the stabilization server.
//!
//! Configuration comes from `STABILIZER_*` environment variables; see
//! [`stabilizer_server::config`].

use std::process::ExitCode;

use stabilizer_server::config::ServerConfig;
use stabilizer_server::router::build_router;
use stabilizer_server::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::new(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(backend = %config.backend, data = %config.data.display(), "failed to initialize state: {e}");
            return ExitCode::FAILURE;
        }
    };

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.addr, "failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        addr = %config.addr,
        backend = %config.backend,
        policy = %config.policy,
        "stabilization server starting"
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

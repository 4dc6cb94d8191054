//! Router assembly for the stabilization HTTP API.
//!
//! [`build_router`] wires all handler functions to their routes with body
//! limit, CORS and tracing middleware layers.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
pub fn build_router(state: AppState) -> Router {
    let max_log_bytes = state.max_log_bytes;
    Router::new()
        // Graph construction
        .route("/sched-dep", get(handlers::graph::sched_dep))
        .route("/add-package", get(handlers::graph::add_package))
        .route("/add-combo", get(handlers::graph::add_combo))
        // Verdicts
        .route("/mark-stable", get(handlers::votes::mark_stable))
        .route("/mark-blocked", get(handlers::votes::mark_blocked))
        // Dispatch
        .route("/request-package", get(handlers::work::request_package))
        .route("/prioritize", get(handlers::work::prioritize))
        // Results
        .route("/submit-log", post(handlers::results::submit_log))
        .route("/status", get(handlers::status::status))
        .layer(DefaultBodyLimit::max(max_log_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

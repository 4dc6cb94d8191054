//! Status handler.

use axum::extract::State;
use axum::Json;

use crate::schema::StatusResponse;
use crate::state::AppState;

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let pending = state.correlations.len();
    let service = state.service.lock().await;
    Json(service.status(pending))
}

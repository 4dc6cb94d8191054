//! Work dispatch and prioritization handlers.

use axum::extract::{Query, State};

use stabilizer_core::{codec, LeafPolicy, TicketId};

use super::{DECODE_FAILURE, OK};
use crate::error::ApiError;
use crate::schema::{PrioritizeParams, RequestWorkParams};
use crate::state::AppState;

/// Body when nothing can be dispatched.
pub const NO_WORK: &str = "None";

/// Hands out the next package to build.
///
/// `GET /request-package[?policy=plain|combination]`
///
/// Pinned packages come first, round-robin. Otherwise a random leaf under
/// the requested policy, suffixed with its active combination's flags under
/// the `combination` policy.
pub async fn request_package(
    State(state): State<AppState>,
    Query(params): Query<RequestWorkParams>,
) -> Result<String, ApiError> {
    let policy = match params.policy.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => Some(raw.parse::<LeafPolicy>().map_err(ApiError::BadRequest)?),
        None => None,
    };

    let item = state.service.lock().await.request_work(policy);
    Ok(item.map_or_else(|| NO_WORK.to_string(), |item| item.to_wire()))
}

/// Pins a package for a tracker ticket.
///
/// `GET /prioritize?package=&ticket=`
pub async fn prioritize(
    State(state): State<AppState>,
    Query(params): Query<PrioritizeParams>,
) -> &'static str {
    let Ok(atom) = codec::decode_atom(&params.package) else {
        return DECODE_FAILURE;
    };
    let Ok(ticket) = params.ticket.trim().parse::<u64>() else {
        return DECODE_FAILURE;
    };
    state.service.lock().await.prioritize(atom, TicketId(ticket));
    OK
}

//! Verdict handlers.

use axum::extract::{Query, State};

use stabilizer_core::{codec, Verdict};

use super::{DECODE_FAILURE, OK};
use crate::schema::VoteParams;
use crate::state::AppState;

/// `GET /mark-stable?package=&id=`
pub async fn mark_stable(
    State(state): State<AppState>,
    Query(params): Query<VoteParams>,
) -> &'static str {
    record(&state, params, Verdict::Stable).await
}

/// `GET /mark-blocked?package=&id=`
pub async fn mark_blocked(
    State(state): State<AppState>,
    Query(params): Query<VoteParams>,
) -> &'static str {
    record(&state, params, Verdict::Unstable).await
}

/// Counts the vote and, when an id is given, remembers it for the log
/// submission that follows.
async fn record(state: &AppState, params: VoteParams, verdict: Verdict) -> &'static str {
    let atom = match codec::decode_atom(&params.package) {
        Ok(atom) => atom,
        Err(e) => {
            tracing::debug!(error = %e, ?verdict, "vote: undecodable atom");
            return DECODE_FAILURE;
        }
    };

    if let Some(id) = params.id.filter(|id| !id.is_empty()) {
        state
            .correlations
            .register(id, atom.clone(), verdict.target_state());
    }

    state.service.lock().await.record_vote(&atom, verdict);
    OK
}

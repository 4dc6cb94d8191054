//! Graph construction handlers.

use axum::extract::{Query, State};

use stabilizer_core::{codec, UseFlagCombination};

use super::{DECODE_FAILURE, OK};
use crate::schema::{ComboParams, PackageParams, SchedDepParams};
use crate::state::AppState;

/// Records that `parent` depends on `dependency`.
///
/// `GET /sched-dep?parent=&dependency=`
///
/// Answers with the dependency's state code as seen from `parent` after the
/// evaluation pass: a dependency that closed a cycle reads `2`.
pub async fn sched_dep(
    State(state): State<AppState>,
    Query(params): Query<SchedDepParams>,
) -> String {
    let (parent, child) = match (
        codec::decode_atom(&params.parent),
        codec::decode_atom(&params.dependency),
    ) {
        (Ok(parent), Ok(child)) => (parent, child),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(error = %e, "sched-dep: undecodable atom");
            return DECODE_FAILURE.to_string();
        }
    };

    let mut service = state.service.lock().await;
    service.schedule_dependency(&parent, &child).code().to_string()
}

/// Creates a package if it does not exist.
///
/// `GET /add-package?package=`
pub async fn add_package(
    State(state): State<AppState>,
    Query(params): Query<PackageParams>,
) -> &'static str {
    let Ok(atom) = codec::decode_atom(&params.package) else {
        return DECODE_FAILURE;
    };
    state.service.lock().await.add_package(&atom);
    OK
}

/// Appends a use-flag combination to a package.
///
/// `GET /add-combo?package=&flags=`
pub async fn add_combo(
    State(state): State<AppState>,
    Query(params): Query<ComboParams>,
) -> &'static str {
    let Ok(atom) = codec::decode_atom(&params.package) else {
        return DECODE_FAILURE;
    };
    let combination = UseFlagCombination::parse(&params.flags);
    state.service.lock().await.add_combination(&atom, combination);
    OK
}

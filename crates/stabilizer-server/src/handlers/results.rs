//! Build-log submission handler.

use axum::extract::{Form, State};

use stabilizer_core::codec;

use super::{DECODE_FAILURE, OK};
use crate::error::ApiError;
use crate::logs::LogArchive;
use crate::reporter::Report;
use crate::schema::SubmitLogForm;
use crate::state::AppState;

/// Archives a build log and closes out its correlation.
///
/// `POST /submit-log` (form: `id`, `log`, `filename`)
///
/// When `id` matches a reported verdict and the package is pinned, the
/// priority entry is retired and the verdict is sent to the reporter in the
/// background.
pub async fn submit_log(
    State(state): State<AppState>,
    Form(form): Form<SubmitLogForm>,
) -> Result<&'static str, ApiError> {
    LogArchive::validate(&form.filename)?;
    let log = match codec::decode_bytes(&form.log) {
        Ok(log) => log,
        Err(e) => {
            tracing::debug!(error = %e, id = %form.id, "submit-log: undecodable log");
            return Ok(DECODE_FAILURE);
        }
    };

    let log_path = state.logs.store(&form.filename, &log).await?;
    tracing::debug!(id = %form.id, path = %log_path.display(), bytes = log.len(), "log archived");

    let Some(pending) = state.correlations.take(&form.id) else {
        return Ok(OK);
    };

    let ticket = state
        .service
        .lock()
        .await
        .retire_priority(pending.atom.as_str());

    if let Some(ticket) = ticket {
        let report = Report {
            ticket,
            atom: pending.atom,
            state: pending.state,
            log_path,
        };
        let reporter = state.reporter.clone();
        tokio::spawn(async move { reporter.report(&report).await });
    }

    Ok(OK)
}

//! `POST /seace/export`: run one extraction and return its outcome.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::{error, info};

use crate::seace::{FilterCriteria, RunOutcome};
use crate::state::AppState;
use crate::web::error::ApiError;

fn outcome_response(outcome: RunOutcome) -> Response {
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome)).into_response()
}

pub async fn export(
    State(state): State<AppState>,
    payload: Result<Json<FilterCriteria>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(criteria) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    if criteria.is_empty() {
        return Err(ApiError::bad_request("Missing parameters"));
    }

    // The run owns its browser until close; a dropped connection must not
    // cancel it halfway.
    let runner = state.runner.clone();
    let guard = state.active_runs.enter();
    let task = tokio::spawn(async move {
        let _guard = guard;
        runner.run(criteria).await
    });

    match task.await {
        Ok(outcome) => {
            info!(
                run_id = outcome.run_id(),
                success = outcome.is_success(),
                "export finished"
            );
            Ok(outcome_response(outcome))
        }
        Err(e) => {
            error!(error = %e, "run task aborted");
            Err(ApiError::internal_error("Run aborted"))
        }
    }
}

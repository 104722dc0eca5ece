//! Submit endpoint — the only user-facing write.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use tracing::info;

use super::middleware_auth::RequireAuth;
use super::{internal_error, AppState};
use crate::db::submissions::SubmitOutcome;
use crate::submission::{SubmissionPayload, SubmitRejection};

/// Map a rejection to its HTTP status: missing things are 404, timing is
/// 403, duplicates are 409, malformed payloads are 400.
fn rejection_status(rejection: &SubmitRejection) -> StatusCode {
    match rejection {
        SubmitRejection::InvalidDay(_) | SubmitRejection::TaskUnpublished(_) => {
            StatusCode::NOT_FOUND
        }
        SubmitRejection::DayNotOpen(_) => StatusCode::FORBIDDEN,
        SubmitRejection::AlreadySubmitted(_) => StatusCode::CONFLICT,
        SubmitRejection::ExpectedText
        | SubmitRejection::ExpectedFile
        | SubmitRejection::EmptyText
        | SubmitRejection::EmptyFileRef
        | SubmitRejection::ExtensionNotAllowed => StatusCode::BAD_REQUEST,
    }
}

/// POST /api/days/{day}/submissions — body `{"text": ...}` or
/// `{"file_ref": ...}` per the task's response type. Creates a pending
/// submission for admin review.
pub(super) async fn handler_submit(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    AxumPath(day): AxumPath<u32>,
    Json(payload): Json<SubmissionPayload>,
) -> impl IntoResponse {
    let today = chrono::Utc::now().date_naive();
    match state
        .db
        .submit(user.user_id, day, &payload, &state.config, today)
        .await
    {
        Ok(SubmitOutcome::Accepted(submission)) => {
            info!(
                user_id = user.user_id,
                day,
                submission_id = submission.id,
                "submission received"
            );
            (
                StatusCode::CREATED,
                Json(serde_json::json!({"submission": submission})),
            )
                .into_response()
        }
        Ok(SubmitOutcome::Rejected(rejection)) => (
            rejection_status(&rejection),
            Json(serde_json::json!({"error": rejection.to_string()})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

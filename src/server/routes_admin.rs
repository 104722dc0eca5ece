//! Admin API — review queue, adjudication, and manual point adjustments.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::middleware_auth::RequireAdmin;
use super::{internal_error, AppState};
use crate::db::points::{AdjustOutcome, GlobalAdjustOutcome};
use crate::db::submissions::{ApproveOutcome, RejectOutcome};

/// GET /api/admin/submissions — the review queue, newest first.
pub(super) async fn handler_submissions_list(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    match state.db.list_submissions().await {
        Ok(submissions) => {
            Json(serde_json::json!({"submissions": submissions})).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// POST /api/admin/submissions/{id}/approve — pending → approved, crediting
/// both ledgers, evaluating rewards, and marking the day opened as one unit.
pub(super) async fn handler_submission_approve(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    AxumPath(id): AxumPath<i64>,
) -> impl IntoResponse {
    match state
        .db
        .approve_submission(id, &state.config.points, &state.config.rewards)
        .await
    {
        Ok(ApproveOutcome::Approved(summary)) => {
            info!(
                admin_id = admin.user_id,
                submission_id = id,
                user_id = summary.user_id,
                day = summary.day,
                bucket = summary.bucket.as_str(),
                credited_personal = summary.credited_personal,
                credited_global = summary.credited_global,
                newly_granted = summary.newly_granted.len(),
                "submission approved"
            );
            Json(serde_json::json!({"approved": summary})).into_response()
        }
        Ok(ApproveOutcome::AlreadyProcessed) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "submission already processed"})),
        )
            .into_response(),
        Ok(ApproveOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "submission not found"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/admin/submissions/{id}/reject — pending → rejected. The user
/// may submit again for the same day.
pub(super) async fn handler_submission_reject(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    AxumPath(id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.reject_submission(id).await {
        Ok(RejectOutcome::Rejected) => {
            info!(admin_id = admin.user_id, submission_id = id, "submission rejected");
            Json(serde_json::json!({"rejected": id})).into_response()
        }
        Ok(RejectOutcome::AlreadyProcessed) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "submission already processed"})),
        )
            .into_response(),
        Ok(RejectOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "submission not found"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Deserialize)]
pub(super) struct UserPointsPayload {
    user_id: i64,
    points: i32,
}

#[derive(Deserialize)]
pub(super) struct GlobalPointsPayload {
    points: i32,
}

fn bad_amount() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": "points must be positive"})),
    )
        .into_response()
}

/// POST /api/admin/points/add — credit a user's free bucket manually.
pub(super) async fn handler_points_add(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<UserPointsPayload>,
) -> impl IntoResponse {
    if payload.points <= 0 {
        return bad_amount();
    }
    match state
        .db
        .adjust_user_points(
            payload.user_id,
            payload.points,
            &state.config.points,
            &state.config.rewards,
        )
        .await
    {
        Ok(AdjustOutcome::Applied {
            balances,
            newly_granted,
        }) => {
            info!(
                admin_id = admin.user_id,
                user_id = payload.user_id,
                points = payload.points,
                "points added"
            );
            Json(serde_json::json!({"balances": balances, "newly_granted": newly_granted}))
                .into_response()
        }
        // Positive deltas never report insufficient balance.
        Ok(AdjustOutcome::InsufficientBalance { .. }) => bad_amount(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/admin/points/remove — subtract from a user's ledger, refused
/// when the amount exceeds the user's current total.
pub(super) async fn handler_points_remove(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<UserPointsPayload>,
) -> impl IntoResponse {
    if payload.points <= 0 {
        return bad_amount();
    }
    match state
        .db
        .adjust_user_points(
            payload.user_id,
            -payload.points,
            &state.config.points,
            &state.config.rewards,
        )
        .await
    {
        Ok(AdjustOutcome::Applied { balances, .. }) => {
            info!(
                admin_id = admin.user_id,
                user_id = payload.user_id,
                points = payload.points,
                "points removed"
            );
            Json(serde_json::json!({"balances": balances})).into_response()
        }
        Ok(AdjustOutcome::InsufficientBalance {
            requested,
            available,
        }) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": format!("cannot remove {requested} points: the user only has {available}")
            })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/admin/global/add — credit the shared global counter.
pub(super) async fn handler_global_add(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<GlobalPointsPayload>,
) -> impl IntoResponse {
    if payload.points <= 0 {
        return bad_amount();
    }
    match state
        .db
        .adjust_global_points(payload.points, &state.config.points)
        .await
    {
        Ok(GlobalAdjustOutcome::Applied { total }) => {
            info!(admin_id = admin.user_id, points = payload.points, total, "global points added");
            Json(serde_json::json!({"global_points": total})).into_response()
        }
        Ok(GlobalAdjustOutcome::InsufficientBalance { .. }) => bad_amount(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/admin/global/remove — subtract from the global counter, refused
/// when the amount exceeds the current total.
pub(super) async fn handler_global_remove(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<GlobalPointsPayload>,
) -> impl IntoResponse {
    if payload.points <= 0 {
        return bad_amount();
    }
    match state
        .db
        .adjust_global_points(-payload.points, &state.config.points)
        .await
    {
        Ok(GlobalAdjustOutcome::Applied { total }) => {
            info!(admin_id = admin.user_id, points = payload.points, total, "global points removed");
            Json(serde_json::json!({"global_points": total})).into_response()
        }
        Ok(GlobalAdjustOutcome::InsufficientBalance {
            requested,
            available,
        }) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": format!("cannot remove {requested} points: the counter is at {available}")
            })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/admin/overview — per-user opened-day counts and totals, the
/// global counter, and the configured reward targets.
pub(super) async fn handler_overview(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    let users = match state.db.user_overview().await {
        Ok(users) => users,
        Err(e) => return internal_error(e),
    };
    let global_points = match state.db.get_global_points().await {
        Ok(total) => total,
        Err(e) => return internal_error(e),
    };
    Json(serde_json::json!({
        "users": users,
        "global_points": global_points,
        "reward_targets": state.config.rewards,
    }))
    .into_response()
}

//! Calendar overview and day view — the user-facing read side.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use super::middleware_auth::RequireAuth;
use super::{internal_error, AppState};
use crate::calendar;

/// GET /api/calendar — everything the calendar page needs: door list with
/// labels, which doors are open today, which the caller has completed, both
/// point balances, the global total, and the reward tables annotated with
/// the caller's grants.
pub(super) async fn handler_calendar(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    match calendar_payload(&state, user.user_id).await {
        Ok(payload) => Json(payload).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn calendar_payload(state: &AppState, user_id: i64) -> anyhow::Result<serde_json::Value> {
    let season = &state.config.season;
    let today = chrono::Utc::now().date_naive();

    let opened = state.db.opened_days(user_id).await?;
    let balances = state.db.get_points(user_id).await?;
    let global_total = state.db.get_global_points().await?;
    let granted: std::collections::HashSet<String> = state
        .db
        .granted_rewards(user_id)
        .await?
        .into_iter()
        .map(|r| r.reward_type)
        .collect();

    let days: Vec<_> = calendar::calendar_days(season)
        .into_iter()
        .map(|d| {
            serde_json::json!({
                "day": d.day,
                "date": d.date,
                "label": d.label,
                "open": calendar::is_day_open(season, d.day, today),
                "opened": opened.contains(&d.day),
            })
        })
        .collect();

    let annotate = |targets: &[crate::config::RewardTarget]| -> Vec<serde_json::Value> {
        targets
            .iter()
            .map(|t| {
                serde_json::json!({
                    "key": t.key,
                    "name": t.name,
                    "threshold": t.threshold,
                    "granted": granted.contains(&t.key),
                })
            })
            .collect()
    };

    Ok(serde_json::json!({
        "season": { "start": season.start, "end": season.end, "days": season.days },
        "today": today,
        "calendar": days,
        "points": {
            "free": balances.free_points,
            "paid": balances.paid_points,
            "total": balances.total(),
        },
        "global_points": global_total,
        "rewards": {
            "personal": annotate(&state.config.rewards.personal),
            "global": annotate(&state.config.rewards.global),
        },
    }))
}

/// GET /api/days/{day} — the published task behind an open door, plus the
/// caller's most recent submission for it (rejected ones included, so the
/// user knows to try again).
pub(super) async fn handler_day(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    AxumPath(day): AxumPath<u32>,
) -> impl IntoResponse {
    let today = chrono::Utc::now().date_naive();

    let task = match state.db.get_published_task(day).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": format!("the task for day {day} is not published")})),
            )
                .into_response()
        }
        Err(e) => return internal_error(e),
    };
    if !calendar::is_day_open(&state.config.season, day, today) {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": format!("day {day} is not open yet")})),
        )
            .into_response();
    }

    match state.db.latest_submission(user.user_id, day).await {
        Ok(submission) => Json(serde_json::json!({
            "day": day,
            "task": task,
            "submission": submission,
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

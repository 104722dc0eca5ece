//! # Server — JSON HTTP Surface
//!
//! Runs an Axum HTTP server over the calendar core: the user-facing calendar
//! and day endpoints, the submit endpoint, and the admin review/adjustment
//! API. Rendering, credential handling, and upload byte storage live in
//! other services; requests arrive carrying a bearer identity token and (for
//! file tasks) an already-stored attachment reference.

pub(crate) mod middleware_auth;
mod routes_admin;
mod routes_calendar;
mod routes_health;
mod routes_submissions;

use crate::config::AppConfig;
use crate::db::Database;
use anyhow::Result;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Instrument};

pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Arc<Self> {
        Arc::new(AppState { db, config })
    }
}

/// Storage failures surface as a generic operation failure; the specific
/// cause goes to the log, not the client.
pub(crate) fn internal_error(e: anyhow::Error) -> axum::response::Response {
    use axum::response::IntoResponse;
    tracing::warn!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({"error": "operation failed"})),
    )
        .into_response()
}

/// Middleware that generates (or propagates) a request ID for correlation
/// and wraps the request in a tracing span using `.instrument()` for proper
/// async propagation.
async fn request_id_middleware(req: Request, next: Next) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/api/calendar", get(routes_calendar::handler_calendar))
        .route("/api/days/{day}", get(routes_calendar::handler_day))
        .route(
            "/api/days/{day}/submissions",
            post(routes_submissions::handler_submit),
        )
        .route(
            "/api/admin/submissions",
            get(routes_admin::handler_submissions_list),
        )
        .route(
            "/api/admin/submissions/{id}/approve",
            post(routes_admin::handler_submission_approve),
        )
        .route(
            "/api/admin/submissions/{id}/reject",
            post(routes_admin::handler_submission_reject),
        )
        .route("/api/admin/points/add", post(routes_admin::handler_points_add))
        .route(
            "/api/admin/points/remove",
            post(routes_admin::handler_points_remove),
        )
        .route("/api/admin/global/add", post(routes_admin::handler_global_add))
        .route(
            "/api/admin/global/remove",
            post(routes_admin::handler_global_remove),
        )
        .route("/api/admin/overview", get(routes_admin::handler_overview))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

/// Connect, build the router, and serve until shutdown.
pub async fn run(host: &str, port: u16, database_url: &str, config: AppConfig) -> Result<()> {
    let db = Database::connect(database_url).await?;
    db.health_check().await?;
    let state = AppState::new(db, config);
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "adventide listening");
    axum::serve(listener, app).await?;
    Ok(())
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
    active_sessions: usize,
}

/// `GET /health`, liveness only.
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(liveness))
}

/// `GET /api/v1/health`, including database connectivity.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, database) = match state.db.ping().await {
        Ok(()) => (StatusCode::OK, "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "disconnected")
        }
    };

    let response = HealthResponse {
        status: if status == StatusCode::OK { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        active_sessions: state.sessions.len(),
    };

    (status, Json(response))
}

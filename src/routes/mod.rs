mod admin;
mod auth;
mod content;
mod health;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health`, lightweight liveness check
/// - `/api/v1/health`, health check with database connectivity
/// - `/api/v1/auth/...`, sign-up, sign-in, sign-out, current user
/// - `/api/v1/content/...`, cached content browsing and search (signed-in users)
/// - `/api/v1/admin/...`, user lifecycle management (super-admin only)
pub fn router() -> Router<AppState> {
    let api_v1 = Router::new()
        .merge(health::api_router())
        .nest("/auth", auth::router())
        .nest("/content", content::router())
        .nest("/admin", admin::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api/v1", api_v1)
}

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::SuperAdminSession;
use crate::domain::{ActivityLogEntry, Role, StatusAction, UserProfile, UserStatistics};
use crate::error::AppError;
use crate::services::lifecycle_service::{NewUser, TransitionOutcome};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the admin route group: `/admin/...`. Every route needs the super-admin.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/export", get(export_users))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/approve", post(approve))
        .route("/users/{id}/reject", post(reject))
        .route("/users/{id}/suspend", post(suspend))
        .route("/users/{id}/reactivate", post(reactivate))
        .route("/users/{id}/role", patch(update_role))
        .route("/statistics", get(statistics))
        .route("/activity", get(activity))
        .route("/cache/clear", post(clear_caches))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct UsersResponse {
    data: Vec<UserProfile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    email: String,
    password: String,
    full_name: Option<String>,
    role: Option<String>,
}

#[derive(Serialize)]
struct UserMutationResponse {
    success: bool,
    message: String,
    user: UserProfile,
}

#[derive(Serialize)]
struct TransitionResponse {
    success: bool,
    changed: bool,
    message: String,
    user: UserProfile,
}

#[derive(Deserialize)]
struct SuspendRequest {
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RoleRequest {
    role: String,
}

#[derive(Serialize)]
struct StatisticsResponse {
    data: UserStatistics,
}

#[derive(Deserialize)]
struct ActivityParams {
    user_id: Option<Uuid>,
    limit: Option<u64>,
}

#[derive(Serialize)]
struct ActivityResponse {
    data: Vec<ActivityLogEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheClearResponse {
    success: bool,
    message: String,
    sessions_cleared: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_role(raw: &str) -> Result<Role, AppError> {
    Role::from_str(raw).ok_or_else(|| AppError::BadRequest(format!("Unknown role `{raw}`.")))
}

fn transition_response(outcome: TransitionOutcome, action: &str) -> Json<TransitionResponse> {
    let message = if outcome.changed {
        format!("User {action}")
    } else {
        format!("User already {action}")
    };
    Json(TransitionResponse {
        success: true,
        changed: outcome.changed,
        message,
        user: outcome.profile,
    })
}

async fn apply(
    state: &AppState,
    actor_id: Uuid,
    user_id: Uuid,
    action: StatusAction,
    reason: Option<&str>,
) -> Result<TransitionOutcome, AppError> {
    Ok(state
        .lifecycle
        .transition(actor_id, user_id, action, reason)
        .await?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/v1/admin/users`
async fn list_users(
    State(state): State<AppState>,
    SuperAdminSession(_admin): SuperAdminSession,
) -> Result<Json<UsersResponse>, AppError> {
    let data = state.lifecycle.list_users().await?;
    Ok(Json(UsersResponse { data }))
}

/// `POST /api/v1/admin/users`
async fn create_user(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = body.role.as_deref().map(parse_role).transpose()?;
    let profile = state
        .lifecycle
        .create_user(
            admin.user_id,
            NewUser {
                email: body.email,
                password: body.password,
                full_name: body.full_name,
                role,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserMutationResponse {
            success: true,
            message: "User created".to_string(),
            user: profile,
        }),
    ))
}

/// `GET /api/v1/admin/users/export`
async fn export_users(
    State(state): State<AppState>,
    SuperAdminSession(_admin): SuperAdminSession,
) -> Result<impl IntoResponse, AppError> {
    let export = state.lifecycle.export_users().await?;
    let body = serde_json::to_string_pretty(&export)?;
    let filename = format!(
        "attachment; filename=\"users-{}.json\"",
        export.exported_at.format("%Y%m%d-%H%M%S")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}

/// `DELETE /api/v1/admin/users/{id}`
async fn delete_user(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserMutationResponse>, AppError> {
    let profile = state.lifecycle.delete(admin.user_id, user_id).await?;
    Ok(Json(UserMutationResponse {
        success: true,
        message: "User deleted".to_string(),
        user: profile,
    }))
}

/// `POST /api/v1/admin/users/{id}/approve`
async fn approve(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = apply(&state, admin.user_id, user_id, StatusAction::Approve, None).await?;
    Ok(transition_response(outcome, "approved"))
}

/// `POST /api/v1/admin/users/{id}/reject`
async fn reject(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = apply(&state, admin.user_id, user_id, StatusAction::Reject, None).await?;
    Ok(transition_response(outcome, "rejected"))
}

/// `POST /api/v1/admin/users/{id}/suspend`
///
/// The body is optional: `{ "reason": "..." }`.
async fn suspend(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
    Path(user_id): Path<Uuid>,
    body: Option<Json<SuspendRequest>>,
) -> Result<Json<TransitionResponse>, AppError> {
    let reason = body.and_then(|Json(b)| b.reason);
    let outcome = apply(
        &state,
        admin.user_id,
        user_id,
        StatusAction::Suspend,
        reason.as_deref(),
    )
    .await?;
    Ok(transition_response(outcome, "suspended"))
}

/// `POST /api/v1/admin/users/{id}/reactivate`
async fn reactivate(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = apply(&state, admin.user_id, user_id, StatusAction::Reactivate, None).await?;
    Ok(transition_response(outcome, "reactivated"))
}

/// `PATCH /api/v1/admin/users/{id}/role`
async fn update_role(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let role = parse_role(&body.role)?;
    let outcome = state
        .lifecycle
        .update_role(admin.user_id, user_id, role)
        .await?;
    Ok(transition_response(outcome, &format!("has role {role}")))
}

/// `GET /api/v1/admin/statistics`
async fn statistics(
    State(state): State<AppState>,
    SuperAdminSession(_admin): SuperAdminSession,
) -> Result<Json<StatisticsResponse>, AppError> {
    let data = state.lifecycle.statistics().await?;
    Ok(Json(StatisticsResponse { data }))
}

/// `GET /api/v1/admin/activity?user_id=...&limit=...`
async fn activity(
    State(state): State<AppState>,
    SuperAdminSession(_admin): SuperAdminSession,
    Query(params): Query<ActivityParams>,
) -> Result<Json<ActivityResponse>, AppError> {
    let data = state
        .lifecycle
        .list_activity(params.user_id, params.limit)
        .await?;
    Ok(Json(ActivityResponse { data }))
}

/// `POST /api/v1/admin/cache/clear`
async fn clear_caches(
    State(state): State<AppState>,
    SuperAdminSession(admin): SuperAdminSession,
) -> Json<CacheClearResponse> {
    let sessions_cleared = state.sessions.clear_caches().await;
    tracing::info!(actor_id = %admin.user_id, sessions_cleared, "session caches cleared");
    Json(CacheClearResponse {
        success: true,
        message: "All caches cleared".to_string(),
        sessions_cleared,
    })
}

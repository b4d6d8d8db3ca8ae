use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::{CurrentSession, bearer_token};
use crate::domain::UserProfile;
use crate::error::AppError;
use crate::provider::AuthUser;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the auth route group: `/auth/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .route("/signout", post(sign_out))
        .route("/me", get(me))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest {
    email: String,
    password: String,
    full_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    success: bool,
    message: String,
    user: AuthUser,
    profile: UserProfile,
}

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    success: bool,
    message: String,
    token: Uuid,
    user: AuthUser,
    profile: UserProfile,
    is_super_admin: bool,
}

#[derive(Serialize)]
struct SignOutResponse {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user: AuthUser,
    profile: UserProfile,
    is_super_admin: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/auth/signup`
async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .lifecycle
        .sign_up(&body.email, &body.password, body.full_name.as_deref())
        .await?;

    let response = SignUpResponse {
        success: true,
        message: outcome.message,
        user: outcome.user,
        profile: outcome.profile,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/v1/auth/signin`
async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let outcome = state.lifecycle.sign_in(&body.email, &body.password).await?;

    Ok(Json(SignInResponse {
        success: true,
        message: outcome.message,
        token: outcome.session.token,
        user: outcome.user,
        profile: outcome.profile,
        is_super_admin: outcome.is_super_admin,
    }))
}

/// `POST /api/v1/auth/signout`
///
/// Always succeeds, even without a valid session.
async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Json<SignOutResponse> {
    if let Ok(token) = bearer_token(&headers) {
        state.lifecycle.sign_out(token).await;
    }
    Json(SignOutResponse {
        success: true,
        message: "Signed out",
    })
}

/// `GET /api/v1/auth/me`
async fn me(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<MeResponse>, AppError> {
    let current = state.lifecycle.current_user(session.user_id).await?;
    Ok(Json(MeResponse {
        user: current.user,
        profile: current.profile,
        is_super_admin: session.is_super_admin,
    }))
}

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::sessions::Session;
use crate::state::AppState;

/// Signed-in session extracted from the `Authorization: Bearer <token>` header.
///
/// ```ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Arc<Session>);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let session = state
            .sessions
            .get(token)
            .ok_or_else(|| AppError::Unauthorized("Session expired or signed out.".to_string()))?;

        Ok(Self(session))
    }
}

/// A session that belongs to the super-admin.
#[derive(Debug, Clone)]
pub struct SuperAdminSession(pub Arc<Session>);

impl FromRequestParts<AppState> for SuperAdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;

        if !session.is_super_admin {
            return Err(AppError::Forbidden("Super admin privileges required.".to_string()));
        }

        Ok(Self(session))
    }
}

/// Parse the session token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header.".to_string()))?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Invalid authorization header format.".to_string())
    })?;

    token
        .trim()
        .parse::<Uuid>()
        .map_err(|_| AppError::Unauthorized("Invalid session token.".to_string()))
}

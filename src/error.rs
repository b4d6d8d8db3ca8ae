use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::provider::ProviderError;

/// Failures of the lifecycle and content services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad credentials, or the provider refused a sign-up or sign-in.
    #[error("{0}")]
    Auth(String),
    /// An authenticated identity has no profile row.
    #[error("User profile not found")]
    ProfileNotFound,
    /// Attempted mutation of the protected super-admin account, or missing privilege.
    #[error("{0}")]
    Permission(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Unified application error type that maps to JSON HTTP responses.
///
/// Every failure renders as `{ "success": false, "code": "...", "message": "..." }`.
#[derive(Debug)]
pub enum AppError {
    /// 400 Bad Request
    BadRequest(String),
    /// 401 Unauthorized
    Unauthorized(String),
    /// 403 Forbidden
    Forbidden(String),
    /// 404 Not Found
    NotFound(String),
    /// 409 Conflict
    Conflict(String),
    /// 502 Bad Gateway, the provider failed
    Provider(ProviderError),
    /// 500 Internal Server Error (logs details, returns generic message)
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "INVALID_TRANSITION", msg),
            Self::Provider(err) => {
                tracing::error!("Provider call failed: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_ERROR",
                    "The data provider is unavailable, please try again".to_string(),
                )
            }
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "success": false,
                "code": code,
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Auth(msg) => Self::Unauthorized(msg),
            ServiceError::ProfileNotFound => Self::NotFound("User profile not found".to_string()),
            ServiceError::Permission(msg) => Self::Forbidden(msg),
            ServiceError::InvalidTransition(msg) => Self::Conflict(msg),
            ServiceError::Validation(msg) => Self::BadRequest(msg),
            ServiceError::Provider(ProviderError::NotFound(what)) => {
                Self::NotFound(format!("{what} not found"))
            }
            ServiceError::Provider(e) => Self::Provider(e),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.into())
    }
}

//! Authentication Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::ErrorResponse;
use crate::db::StoreError;

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid or malformed token.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Missing Authorization header.
    #[error("Missing authorization header")]
    MissingAuthHeader,

    /// Invalid authorization header format.
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    /// Token subject no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// User has no role and the default role is not seeded.
    #[error("User has no role")]
    MissingRole,

    /// Store error while resolving the caller.
    #[error("Internal server error")]
    Store(#[from] StoreError),

    /// JWT encoding error.
    #[error("Token error")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            Self::MissingAuthHeader => (StatusCode::UNAUTHORIZED, "MISSING_AUTH"),
            Self::InvalidAuthHeader => (StatusCode::UNAUTHORIZED, "INVALID_AUTH_HEADER"),
            Self::UserNotFound => (StatusCode::UNAUTHORIZED, "USER_NOT_FOUND"),
            Self::MissingRole => (StatusCode::FORBIDDEN, "MISSING_ROLE"),
            Self::Store(e) => {
                tracing::error!(error = ?e, "Failed to resolve authenticated user");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            Self::Jwt(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
            errors: None,
        });

        (status, body).into_response()
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

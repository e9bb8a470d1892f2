//! API Error Types
//!
//! Every handler returns [`ApiError`] so clients see one error shape:
//! `{"error": code, "message": text, "errors"?: {field: [messages]}}`.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::StoreError;
use crate::permissions::RoleAssignmentError;

/// Validation messages keyed by request field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("This action is unauthorized")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("The given data was invalid")]
    ValidationFailed(FieldErrors),

    #[error("Internal server error")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::ValidationFailed(errors)
    }

    const fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::ValidationFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Per-field validation messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if let Self::Store(e) = &self {
            tracing::error!(error = ?e, "Store operation failed");
        }

        let message = self.to_string();
        let errors = match self {
            Self::ValidationFailed(errors) => Some(errors),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            errors,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or_else(|| format!("The {field} field is invalid."), ToString::to_string)
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self::ValidationFailed(fields)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => Self::Store(e),
            AuthError::MissingRole => Self::Forbidden,
            _ => Self::Unauthenticated,
        }
    }
}

impl From<RoleAssignmentError> for ApiError {
    fn from(err: RoleAssignmentError) -> Self {
        match err {
            RoleAssignmentError::NotFound => Self::NotFound("Role"),
            RoleAssignmentError::Hierarchy(violation) => {
                Self::invalid(violation.field, violation.to_string())
            }
            RoleAssignmentError::Store(e) => Self::Store(e),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::HierarchyViolation;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("Post").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::invalid("e", "bad").into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_hierarchy_violation_maps_to_role_id_field() {
        let err = ApiError::from(RoleAssignmentError::Hierarchy(HierarchyViolation {
            field: "role_id",
            actor_hierarchy: 5,
            target_hierarchy: 3,
        }));

        let ApiError::ValidationFailed(fields) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(
            fields["role_id"],
            vec!["The role_id have a higher hierarchy than the allowed.".to_string()]
        );
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("Failed to parse the request body as JSON".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_role_is_not_found() {
        let err = ApiError::from(RoleAssignmentError::NotFound);
        assert!(matches!(err, ApiError::NotFound("Role")));
    }
}

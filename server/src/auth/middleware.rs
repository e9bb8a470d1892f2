//! Authentication Middleware

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::{ApiError, AppState};
use crate::db::Store;
use crate::permissions::{authorize, Action, Resource, Role};

use super::error::{AuthError, AuthResult};
use super::jwt::validate_access_token;

/// Authenticated caller injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Effective role (first assignment, or the configured default role).
    pub role: Role,
}

impl AuthUser {
    /// Whether this caller may perform `action` on `resource`.
    #[must_use]
    pub fn can(&self, action: Action, resource: Resource) -> bool {
        authorize(self.id, &self.role, action, resource)
    }

    /// Like [`Self::can`], failing with `Forbidden`.
    pub fn require(&self, action: Action, resource: Resource) -> Result<(), ApiError> {
        if self.can(action, resource) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.id,
                role = %self.role.name,
                %action,
                ?resource,
                "Authorization denied"
            );
            Err(ApiError::Forbidden)
        }
    }
}

/// Load a user and their effective role.
pub async fn load_auth_user(
    store: &dyn Store,
    default_role: &str,
    user_id: Uuid,
) -> AuthResult<AuthUser> {
    let user = store
        .find_user(user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let role = match store.roles_for_user(user.id).await?.into_iter().next() {
        Some(role) => role,
        None => store
            .find_role_by_name(default_role)
            .await?
            .ok_or(AuthError::MissingRole)?,
    };

    Ok(AuthUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role,
    })
}

/// Middleware resolving the caller from a bearer token.
///
/// Requests without an Authorization header pass through anonymously.
/// A header that is present but malformed, expired or for an unknown user
/// is rejected. Handlers pick the caller up with the `AuthUser` or
/// `Option<AuthUser>` extractors.
pub async fn resolve_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(auth_header) = request.headers().get(AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidAuthHeader)?;

    let claims = validate_access_token(token, &state.config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let auth_user = load_auth_user(state.store.as_ref(), &state.config.default_role, user_id).await?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extractor for routes that require a caller.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Extractor for routes where the caller is optional.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned())
    }
}

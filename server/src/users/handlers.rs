//! API handlers for users and roles.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use pb_common::{RoleResource, UserResource};
use uuid::Uuid;
use validator::Validate;

use super::service::{self, ProfileChanges};
use super::types::{AssignRoleRequest, UpdateUserRequest};
use crate::api::{ApiError, ApiJson, ApiPath, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::db::User;
use crate::permissions::{check_role_assignment, Action, Resource};

async fn load_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or(ApiError::NotFound("User"))
}

/// User with their effective role and its permission names.
async fn present_user(state: &AppState, user: User) -> ApiResult<UserResource> {
    let role = state.store.roles_for_user(user.id).await?.into_iter().next();
    let permissions = role
        .as_ref()
        .map(|r| r.permissions.iter().cloned().collect())
        .unwrap_or_default();

    Ok(UserResource {
        id: user.id,
        name: user.name,
        email: user.email,
        email_verified_at: user.email_verified_at,
        role: role.as_ref().map(RoleResource::from),
        permissions,
        created_at: user.created_at,
    })
}

/// Current user.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "users",
    responses(
        (status = 200, description = "Authenticated user", body = UserResource),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing read-profile"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserResource>> {
    auth.require(Action::Read, Resource::Profile)?;
    let user = load_user(&state, auth.id).await?;
    let mut resource = present_user(&state, user).await?;

    // Users without an assignment act with the default role.
    if resource.role.is_none() {
        resource.role = Some(RoleResource::from(&auth.role));
        resource.permissions = auth.role.permissions.iter().cloned().collect();
    }

    Ok(Json(resource))
}

/// Update a user's name or email.
///
/// Changing the email clears verification.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResource),
        (status = 403, description = "Not this user and missing update-users"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation failed"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth, body), fields(actor_id = %auth.id))]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResource>> {
    let user = load_user(&state, id).await?;
    auth.require(Action::Update, Resource::User { id: user.id })?;
    body.validate()?;

    let saved = service::save_user(
        state.store.as_ref(),
        &state.events,
        user,
        ProfileChanges {
            name: body.name.map(|n| n.trim().to_string()),
            email: body.email.map(|e| e.trim().to_string()),
        },
    )
    .await?;

    Ok(Json(present_user(&state, saved).await?))
}

/// Assign a role to a user, replacing their current roles.
///
/// The caller may only hand out roles ranked below their own, unless they
/// are at the top of the hierarchy or re-assign their own role.
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = UserResource),
        (status = 403, description = "Missing update-users"),
        (status = 404, description = "User or role not found"),
        (status = 422, description = "Role ranks at or above the caller's"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth, body), fields(actor_id = %auth.id, role_id = %body.role_id))]
pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignRoleRequest>,
) -> ApiResult<Json<UserResource>> {
    auth.require(Action::Update, Resource::Users)?;
    let user = load_user(&state, id).await?;

    let role = check_role_assignment(state.store.as_ref(), &auth.role, body.role_id).await?;
    state.store.sync_user_role(user.id, role.id).await?;
    tracing::info!(user_id = %user.id, role = %role.name, "Role assigned");

    Ok(Json(present_user(&state, user).await?))
}

/// Delete a user.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Missing delete-users"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth), fields(actor_id = %auth.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    auth.require(Action::Delete, Resource::Users)?;
    service::delete_user(state.store.as_ref(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List roles, top of the hierarchy first.
#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "users",
    responses(
        (status = 200, description = "Roles", body = Vec<RoleResource>),
        (status = 403, description = "Missing read-roles"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth), fields(actor_id = %auth.id))]
pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<RoleResource>>> {
    auth.require(Action::Read, Resource::Roles)?;
    let roles = state.store.list_roles().await?;

    Ok(Json(roles.iter().map(RoleResource::from).collect()))
}

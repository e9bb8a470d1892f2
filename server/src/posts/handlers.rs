//! API handlers for posts.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use pb_common::{Paginated, PostAuthor, PostResource, TagResource};
use uuid::Uuid;
use validator::Validate;

use super::constants::PAGE_SIZE;
use super::filter::PostFilter;
use super::types::{ListPostsQuery, PostRequest};
use crate::api::{ApiError, ApiJson, ApiPath, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::config::Config;
use crate::db::{normalize_tag_names, NewPost, Post, PostChanges, Tag, User};
use crate::permissions::{Action, ResourceKind, Resource};

// ============================================================================
// Presentation
// ============================================================================

fn to_resource(config: &Config, post: Post, owner: Option<&User>, tags: Vec<Tag>) -> PostResource {
    let mut tags: Vec<TagResource> = tags.into_iter().map(|t| TagResource::new(t.name)).collect();
    tags.sort();

    PostResource {
        id: post.id,
        title: post.title,
        description: post.description,
        content: post.content,
        banner: post
            .banner
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|b| config.asset_url(b)),
        visible: post.visible,
        private: post.private,
        user: owner.map(|u| PostAuthor {
            id: u.id,
            name: u.name.clone(),
        }),
        tags,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

/// Attach owners and tags with one batched lookup each.
async fn present_posts(state: &AppState, posts: Vec<Post>) -> ApiResult<Vec<PostResource>> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let mut owner_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();

    let owners: HashMap<Uuid, User> = state
        .store
        .find_users(&owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let mut tags = state.store.tags_for_posts(&post_ids).await?;

    Ok(posts
        .into_iter()
        .map(|post| {
            let owner = owners.get(&post.user_id);
            let post_tags = tags.remove(&post.id).unwrap_or_default();
            to_resource(&state.config, post, owner, post_tags)
        })
        .collect())
}

async fn present_post(state: &AppState, post: Post) -> ApiResult<PostResource> {
    present_posts(state, vec![post])
        .await?
        .pop()
        .ok_or(ApiError::NotFound("Post"))
}

async fn load_post(state: &AppState, id: Uuid) -> ApiResult<Post> {
    state
        .store
        .find_post(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))
}

// ============================================================================
// Handlers
// ============================================================================

/// List posts.
///
/// Newest first, 15 per page. See [`PostFilter`] for how the query
/// parameters combine.
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "Page of posts"),
        (status = 401, description = "mine or p without authentication"),
        (status = 403, description = "mine without the create-posts capability"),
        (status = 422, description = "Invalid exclusion list"),
    ),
)]
#[tracing::instrument(skip(state, caller))]
pub async fn list_posts(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Json<Paginated<PostResource>>> {
    let filter = PostFilter::from_query(&query, caller.as_ref())?;
    let page = query.page();

    let result = state.store.list_posts(&filter, page, PAGE_SIZE).await?;
    let data = present_posts(&state, result.posts).await?;

    Ok(Json(Paginated::new(data, page, PAGE_SIZE, result.total)))
}

/// Create a post.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResource),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing create-posts capability"),
        (status = 422, description = "Validation failed"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth, body), fields(user_id = %auth.id))]
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<PostRequest>,
) -> ApiResult<(StatusCode, Json<PostResource>)> {
    auth.require(Action::Create, Resource::Posts)?;
    body.validate()?;

    let tags = body.tags.as_deref().map(normalize_tag_names).unwrap_or_default();
    let new_post = NewPost {
        user_id: auth.id,
        title: body.title,
        description: body.description,
        content: body.content,
        banner: body.banner.filter(|b| !b.trim().is_empty()),
        visible: body.visible.unwrap_or(true),
        private: body.private.unwrap_or(false),
    };

    let post = state.store.create_post(new_post, &tags).await?;
    tracing::info!(post_id = %post.id, tags = tags.len(), "Post created");

    Ok((StatusCode::CREATED, Json(present_post(&state, post).await?)))
}

/// Show a post.
///
/// Hidden posts are only readable by their owner or by callers who may
/// update any post; everyone else gets 404. Private posts need a caller.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post", body = PostResource),
        (status = 401, description = "Private post without authentication"),
        (status = 404, description = "Post not found"),
    ),
)]
#[tracing::instrument(skip(state, caller))]
pub async fn show_post(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PostResource>> {
    let post = load_post(&state, id).await?;

    if !post.visible {
        let allowed = caller.as_ref().is_some_and(|c| {
            c.id == post.user_id || c.role.grants(Action::Update, ResourceKind::Posts)
        });
        if !allowed {
            return Err(ApiError::NotFound("Post"));
        }
    }

    if post.private && caller.is_none() {
        return Err(ApiError::Unauthenticated);
    }

    Ok(Json(present_post(&state, post).await?))
}

/// Load a post for editing.
#[utoipa::path(
    get,
    path = "/api/posts/{id}/edit",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post", body = PostResource),
        (status = 403, description = "Not the owner and missing update-posts"),
        (status = 404, description = "Post not found"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn edit_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PostResource>> {
    let post = load_post(&state, id).await?;
    auth.require(Action::Update, Resource::Post { owner_id: post.user_id })?;

    Ok(Json(present_post(&state, post).await?))
}

/// Update a post.
///
/// The banner is only replaced when a non-empty value is sent that differs
/// from the URL the post currently exposes. Tags are synced when a
/// non-empty list is sent.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = PostRequest,
    responses(
        (status = 200, description = "Post updated"),
        (status = 403, description = "Not the owner and missing update-posts"),
        (status = 404, description = "Post not found"),
        (status = 422, description = "Validation failed"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth, body), fields(user_id = %auth.id))]
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<PostRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let post = load_post(&state, id).await?;
    auth.require(Action::Update, Resource::Post { owner_id: post.user_id })?;
    body.validate()?;

    let current_banner_url = state
        .config
        .asset_url(post.banner.as_deref().unwrap_or_default());
    let banner = body
        .banner
        .filter(|b| !b.trim().is_empty() && *b != current_banner_url);

    let tags = body
        .tags
        .as_deref()
        .map(normalize_tag_names)
        .filter(|t| !t.is_empty());

    let changes = PostChanges {
        title: body.title,
        description: body.description,
        content: body.content,
        banner,
        visible: body.visible,
        private: body.private,
    };

    state
        .store
        .update_post(post.id, changes, tags.as_deref())
        .await?;
    tracing::info!(post_id = %post.id, "Post updated");

    Ok(Json(serde_json::Value::Null))
}

/// Delete a post.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Not the owner and missing delete-posts"),
        (status = 404, description = "Post not found"),
    ),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let post = load_post(&state, id).await?;
    auth.require(Action::Delete, Resource::Post { owner_id: post.user_id })?;

    if !state.store.delete_post(post.id).await? {
        return Err(ApiError::NotFound("Post"));
    }
    tracing::info!(post_id = %post.id, "Post deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// List all tag names alphabetically.
#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "posts",
    responses((status = 200, description = "All tags", body = Vec<TagResource>)),
)]
#[tracing::instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<TagResource>>> {
    let tags = state.store.list_tags().await?;
    Ok(Json(tags.into_iter().map(|t| TagResource::new(t.name)).collect()))
}

//! API Router and Application State
//!
//! Central routing configuration and shared state.

mod error;
mod extract;

use std::sync::Arc;

use axum::{extract::State, middleware::from_fn_with_state, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{auth, config::Config, db::Store, permissions::RolesConfig, posts, users};

pub use error::{ApiError, ApiResult, ErrorResponse, FieldErrors};
pub use extract::{ApiJson, ApiPath};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend (`PostgreSQL` or in-memory)
    pub store: Arc<dyn Store>,
    /// Server configuration
    pub config: Arc<Config>,
    /// Role structure the store was seeded from
    pub roles: Arc<RolesConfig>,
    /// User lifecycle events
    pub events: users::EventSender,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        config: Config,
        roles: RolesConfig,
        events: users::EventSender,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            roles: Arc::new(roles),
            events,
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Posts and tags
        .nest("/api/posts", posts::router())
        .route("/api/tags", get(posts::handlers::list_tags))
        // Users and roles
        .nest("/api/users", users::router())
        .merge(users::account_router())
        // API documentation
        .route("/api/openapi.json", get(openapi_json))
        // Resolve the caller for every route; handlers decide whether one is required
        .layer(from_fn_with_state(state.clone(), auth::resolve_auth))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether the `PostgreSQL` store is in use
    database: bool,
    /// Number of configured roles
    roles: usize,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        database: state.config.has_database(),
        roles: state.roles.roles().len(),
    })
}

// ============================================================================
// API Documentation
// ============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        posts::handlers::list_posts,
        posts::handlers::create_post,
        posts::handlers::show_post,
        posts::handlers::edit_post,
        posts::handlers::update_post,
        posts::handlers::delete_post,
        posts::handlers::list_tags,
        users::handlers::me,
        users::handlers::update_user,
        users::handlers::assign_role,
        users::handlers::delete_user,
        users::handlers::list_roles,
    ),
    components(schemas(
        pb_common::PostResource,
        pb_common::PostAuthor,
        pb_common::TagResource,
        pb_common::PageMeta,
        pb_common::UserResource,
        pb_common::RoleResource,
        posts::PostRequest,
        users::types::UpdateUserRequest,
        users::types::AssignRoleRequest,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "posts", description = "Posts and tags"),
        (name = "users", description = "Users and roles"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

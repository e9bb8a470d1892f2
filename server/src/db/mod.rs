//! Database Layer
//!
//! Storage traits shared by the `PostgreSQL` store and the in-memory store.
//! Handlers only ever see `Arc<dyn Store>`.

mod memory;
mod models;
mod postgres;


use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

use crate::permissions::{Role, RolesConfig};
use crate::posts::filter::PostFilter;

/// Storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Store Traits
// ============================================================================

#[async_trait]
pub trait PostStore: Send + Sync {
    /// One page of posts matching `filter`, newest first.
    async fn list_posts(&self, filter: &PostFilter, page: i64, per_page: i64)
        -> StoreResult<PostPage>;

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>>;

    /// Insert a post and attach `tags`, creating unknown tags.
    async fn create_post(&self, post: NewPost, tags: &[String]) -> StoreResult<Post>;

    /// Apply `changes`; when `tags` is given the post's tags are replaced by it.
    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
        tags: Option<&[String]>,
    ) -> StoreResult<Post>;

    /// Remove a post and its tag links. Returns false when it did not exist.
    async fn delete_post(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    /// All tags ordered by name.
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;

    /// Tags of each post, ordered by name. Posts without tags are absent.
    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Tag>>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Bulk lookup to avoid N+1 queries.
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Insert a user. Fails with `Conflict` on a duplicate email.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Persist name, email and verification state.
    async fn save_user(&self, user: &User) -> StoreResult<User>;

    /// Revoke every role assignment, then remove the user.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role(&self, id: Uuid) -> StoreResult<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    /// All roles, top of the hierarchy first.
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    /// Create or update roles and permissions from `config`. Idempotent.
    async fn seed_roles(&self, config: &RolesConfig) -> StoreResult<Vec<Role>>;

    /// Roles assigned to a user in assignment order.
    async fn roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Role>>;

    /// Add a role assignment. Assigning an already held role is a no-op.
    async fn attach_role(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()>;

    /// Replace all of a user's role assignments with `role_id`.
    async fn sync_user_role(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()>;
}

/// Everything the API needs from persistence.
pub trait Store: PostStore + TagStore + UserStore + RoleStore {}

impl<T> Store for T where T: PostStore + TagStore + UserStore + RoleStore {}

/// Rows to skip for a 1-based `page`.
///
/// Saturates instead of overflowing, so a huge page number lands past the
/// last row and yields an empty page.
#[must_use]
pub const fn page_offset(page: i64, per_page: i64) -> i64 {
    let page = if page < 1 { 1 } else { page };
    let per_page = if per_page < 0 { 0 } else { per_page };
    (page - 1).saturating_mul(per_page)
}

// ============================================================================
// Connection
// ============================================================================

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(2)
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

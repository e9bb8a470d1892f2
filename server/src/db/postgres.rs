//! `PostgreSQL` store.
//!
//! Runtime queries (no compile-time `DATABASE_URL` required). Multi-statement
//! writes run in a transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::error;
use uuid::Uuid;

use super::models::{NewPost, NewUser, Post, PostChanges, PostPage, PostTagRow, Tag, User};
use super::{page_offset, PostStore, RoleStore, StoreError, StoreResult, TagStore, UserStore};
use crate::permissions::{Role, RolesConfig};
use crate::posts::filter::{PostFilter, PostPredicate};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr) => {
        |e| {
            error!(query = $query, error = %e, "Database query failed");
            e
        }
    };
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

/// Map unique violations to `Conflict`.
fn conflict_or(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{what} already exists"))
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Debug, FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: Post,
    total_count: i64,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    hierarchy: i32,
    permissions: Vec<String>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            hierarchy: row.hierarchy,
            permissions: row.permissions.into_iter().collect(),
        }
    }
}

const ROLE_SELECT: &str = "SELECT r.id, r.name, r.hierarchy, \
     COALESCE(array_agg(p.name::text ORDER BY p.name) FILTER (WHERE p.name IS NOT NULL), '{}'::text[]) AS permissions \
     FROM roles r \
     LEFT JOIN permission_role pr ON pr.role_id = r.id \
     LEFT JOIN permissions p ON p.id = pr.permission_id";

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Append one predicate as a SQL condition on `posts p`.
fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &PostPredicate) {
    match predicate {
        PostPredicate::OwnedBy(user_id) => {
            builder.push("p.user_id = ").push_bind(*user_id);
        }
        PostPredicate::Visibility { private } => {
            builder
                .push("p.visible = TRUE AND p.private = ")
                .push_bind(*private);
        }
        PostPredicate::Search(term) => {
            let pattern = term.like_pattern();
            builder
                .push("(p.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.content ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        PostPredicate::AnyTag(names) => {
            builder
                .push(
                    "EXISTS (SELECT 1 FROM post_tag pt JOIN tags t ON t.id = pt.tag_id \
                     WHERE pt.post_id = p.id AND t.name = ANY(",
                )
                .push_bind(names.clone())
                .push("))");
        }
        PostPredicate::Exclude(pattern) => {
            let alternation = pattern.alternation().to_string();
            builder
                .push("(p.title !~* ")
                .push_bind(alternation.clone())
                .push(" AND p.content !~* ")
                .push_bind(alternation)
                .push(")");
        }
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    builder.push(" WHERE TRUE");
    for predicate in filter.predicates() {
        builder.push(" AND ");
        push_predicate(builder, predicate);
    }
}

// ============================================================================
// Transaction Helpers
// ============================================================================

/// Replace a post's tags with `names`, creating missing tags.
async fn sync_tags(conn: &mut PgConnection, post_id: Uuid, names: &[String]) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM post_tag WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if names.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = names.iter().map(|_| Uuid::now_v7()).collect();
    sqlx::query(
        "INSERT INTO tags (id, name) SELECT * FROM UNNEST($1::uuid[], $2::text[]) \
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(&ids)
    .bind(names)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "INSERT INTO post_tag (post_id, tag_id) SELECT $1, id FROM tags WHERE name = ANY($2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(names)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// ============================================================================
// Post Queries
// ============================================================================

#[async_trait]
impl PostStore for PgStore {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: i64,
        per_page: i64,
    ) -> StoreResult<PostPage> {
        let offset = page_offset(page, per_page);

        let mut builder = QueryBuilder::new("SELECT p.*, COUNT(*) OVER() AS total_count FROM posts p");
        push_where(&mut builder, filter);
        builder
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<PostRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error!("list_posts", page = page))?;

        let total = match rows.first() {
            Some(row) => row.total_count,
            // Past the last page the window count is unavailable.
            None if page > 1 => {
                let mut count = QueryBuilder::new("SELECT COUNT(*) FROM posts p");
                push_where(&mut count, filter);
                count
                    .build_query_scalar::<i64>()
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error!("count_posts"))?
            }
            None => 0,
        };

        Ok(PostPage {
            posts: rows.into_iter().map(|r| r.post).collect(),
            total,
        })
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("find_post", post_id = %id))?)
    }

    async fn create_post(&self, post: NewPost, tags: &[String]) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Post>(
            r"
            INSERT INTO posts (id, user_id, title, description, content, banner, visible, private)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(Uuid::now_v7())
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.content)
        .bind(&post.banner)
        .bind(post.visible)
        .bind(post.private)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error!("create_post", user_id = %post.user_id))?;

        sync_tags(&mut tx, created.id, tags)
            .await
            .map_err(db_error!("sync_tags", post_id = %created.id))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
        tags: Option<&[String]>,
    ) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Post>(
            r"
            UPDATE posts SET
                title = $2,
                description = $3,
                content = $4,
                banner = COALESCE($5, banner),
                visible = COALESCE($6, visible),
                private = COALESCE($7, private),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.content)
        .bind(&changes.banner)
        .bind(changes.visible)
        .bind(changes.private)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error!("update_post", post_id = %id))?
        .ok_or(StoreError::NotFound("Post"))?;

        if let Some(tags) = tags {
            sync_tags(&mut tx, id, tags)
                .await
                .map_err(db_error!("sync_tags", post_id = %id))?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error!("delete_post", post_id = %id))?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Tag Queries
// ============================================================================

#[async_trait]
impl TagStore for PgStore {
    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error!("list_tags"))?)
    }

    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Tag>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PostTagRow>(
            r"
            SELECT pt.post_id, t.id, t.name
            FROM post_tag pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name
            ",
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("tags_for_posts"))?;

        let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in rows {
            grouped.entry(row.post_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
            });
        }
        Ok(grouped)
    }
}

// ============================================================================
// User Queries
// ============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("find_user", user_id = %id))?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error!("find_users"))?)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (id, name, email, password_hash, email_verified_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(Uuid::now_v7())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.email_verified_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "email"))
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r"
            UPDATE users SET
                name = $2,
                email = $3,
                email_verified_at = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.email_verified_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "email"))?
        .ok_or(StoreError::NotFound("User"))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_user WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error!("revoke_roles", user_id = %id))?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error!("delete_user", user_id = %id))?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Role Queries
// ============================================================================

#[async_trait]
impl RoleStore for PgStore {
    async fn find_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let mut builder = QueryBuilder::new(ROLE_SELECT);
        builder.push(" WHERE r.id = ").push_bind(id).push(" GROUP BY r.id");

        let row: Option<RoleRow> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("find_role", role_id = %id))?;
        Ok(row.map(Role::from))
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let mut builder = QueryBuilder::new(ROLE_SELECT);
        builder
            .push(" WHERE r.name = ")
            .push_bind(name)
            .push(" GROUP BY r.id");

        let row: Option<RoleRow> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("find_role_by_name", role = %name))?;
        Ok(row.map(Role::from))
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let mut builder = QueryBuilder::new(ROLE_SELECT);
        builder.push(" GROUP BY r.id ORDER BY r.hierarchy, r.name");

        let rows: Vec<RoleRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error!("list_roles"))?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn seed_roles(&self, config: &RolesConfig) -> StoreResult<Vec<Role>> {
        let mut tx = self.pool.begin().await?;

        let permission_names: Vec<String> = config.permission_names().into_iter().collect();
        let permission_ids: Vec<Uuid> = permission_names.iter().map(|_| Uuid::now_v7()).collect();
        sqlx::query(
            "INSERT INTO permissions (id, name) SELECT * FROM UNNEST($1::uuid[], $2::text[]) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(&permission_ids)
        .bind(&permission_names)
        .execute(&mut *tx)
        .await
        .map_err(db_error!("seed_permissions"))?;

        for seed in config.roles() {
            let role_id: Uuid = sqlx::query_scalar(
                r"
                INSERT INTO roles (id, name, hierarchy)
                VALUES ($1, $2, $3)
                ON CONFLICT (name) DO UPDATE SET hierarchy = EXCLUDED.hierarchy, updated_at = NOW()
                RETURNING id
                ",
            )
            .bind(Uuid::now_v7())
            .bind(&seed.name)
            .bind(seed.hierarchy)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error!("seed_role", role = %seed.name))?;

            let names: Vec<String> = seed.permissions.iter().cloned().collect();
            sqlx::query("DELETE FROM permission_role WHERE role_id = $1")
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO permission_role (permission_id, role_id) \
                 SELECT id, $1 FROM permissions WHERE name = ANY($2)",
            )
            .bind(role_id)
            .bind(&names)
            .execute(&mut *tx)
            .await
            .map_err(db_error!("seed_role_permissions", role = %seed.name))?;
        }

        tx.commit().await?;
        self.list_roles().await
    }

    async fn roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let mut builder = QueryBuilder::new(ROLE_SELECT);
        builder
            .push(" JOIN role_user ru ON ru.role_id = r.id WHERE ru.user_id = ")
            .push_bind(user_id)
            .push(" GROUP BY r.id, ru.assigned_at ORDER BY ru.assigned_at");

        let rows: Vec<RoleRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error!("roles_for_user", user_id = %user_id))?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn attach_role(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO role_user (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(db_error!("attach_role", user_id = %user_id, role_id = %role_id))?;
        Ok(())
    }

    async fn sync_user_role(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_user WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error!("revoke_roles", user_id = %user_id))?;

        sqlx::query("INSERT INTO role_user (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error!("assign_role", user_id = %user_id, role_id = %role_id))?;

        tx.commit().await?;
        Ok(())
    }
}

//! In-memory store.
//!
//! Used when no `DATABASE_URL` is configured and by the test suite. Listing
//! evaluates the same [`PostFilter`] predicates the `PostgreSQL` store
//! compiles to SQL.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{NewPost, NewUser, Post, PostChanges, PostPage, Tag, User};
use super::{page_offset, PostStore, RoleStore, StoreError, StoreResult, TagStore, UserStore};
use crate::permissions::{Role, RolesConfig};
use crate::posts::filter::PostFilter;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    /// Tags keyed by name.
    tags: BTreeMap<String, Tag>,
    /// Tag names per post.
    post_tags: HashMap<Uuid, BTreeSet<String>>,
    roles: Vec<Role>,
    /// `(user_id, role_id)` in assignment order.
    role_users: Vec<(Uuid, Uuid)>,
}

impl Inner {
    fn tags_of(&self, post_id: Uuid) -> Vec<Tag> {
        self.post_tags
            .get(&post_id)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| self.tags.get(name).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn sync_tags(&mut self, post_id: Uuid, names: &[String]) {
        for name in names {
            self.tags.entry(name.clone()).or_insert_with(|| Tag {
                id: Uuid::now_v7(),
                name: name.clone(),
            });
        }
        self.post_tags
            .insert(post_id, names.iter().cloned().collect());
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }
}

/// Store backed by process memory behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: i64,
        per_page: i64,
    ) -> StoreResult<PostPage> {
        let inner = self.inner.read().await;
        let needs_tags = filter.needs_tags();

        let mut matched: Vec<&Post> = inner
            .posts
            .values()
            .filter(|post| {
                let tags = if needs_tags {
                    inner.tags_of(post.id)
                } else {
                    Vec::new()
                };
                filter.matches(post, &tags)
            })
            .collect();

        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matched.len() as i64;
        let offset = usize::try_from(page_offset(page, per_page)).unwrap_or(usize::MAX);
        let posts = matched
            .into_iter()
            .skip(offset)
            .take(per_page.max(0) as usize)
            .cloned()
            .collect();

        Ok(PostPage { posts, total })
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.inner.read().await.posts.get(&id).cloned())
    }

    async fn create_post(&self, post: NewPost, tags: &[String]) -> StoreResult<Post> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&post.user_id) {
            return Err(StoreError::NotFound("User"));
        }

        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            user_id: post.user_id,
            title: post.title,
            description: post.description,
            content: post.content,
            banner: post.banner,
            visible: post.visible,
            private: post.private,
            created_at: now,
            updated_at: now,
        };

        inner.posts.insert(post.id, post.clone());
        if !tags.is_empty() {
            inner.sync_tags(post.id, tags);
        }

        Ok(post)
    }

    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
        tags: Option<&[String]>,
    ) -> StoreResult<Post> {
        let mut inner = self.inner.write().await;
        let post = inner.posts.get_mut(&id).ok_or(StoreError::NotFound("Post"))?;

        post.title = changes.title;
        post.description = changes.description;
        post.content = changes.content;
        if let Some(banner) = changes.banner {
            post.banner = Some(banner);
        }
        if let Some(visible) = changes.visible {
            post.visible = visible;
        }
        if let Some(private) = changes.private {
            post.private = private;
        }
        post.updated_at = Utc::now();
        let updated = post.clone();

        if let Some(tags) = tags {
            inner.sync_tags(id, tags);
        }

        Ok(updated)
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        inner.post_tags.remove(&id);
        Ok(inner.posts.remove(&id).is_some())
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.inner.read().await.tags.values().cloned().collect())
    }

    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Tag>>> {
        let inner = self.inner.read().await;
        Ok(post_ids
            .iter()
            .map(|id| (*id, inner.tags_of(*id)))
            .filter(|(_, tags)| !tags.is_empty())
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, None) {
            return Err(StoreError::Conflict(format!("email {} already taken", user.email)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            email_verified_at: user.email_verified_at,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::Conflict(format!("email {} already taken", user.email)));
        }

        let stored = inner
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::NotFound("User"))?;
        stored.name.clone_from(&user.name);
        stored.email.clone_from(&user.email);
        stored.email_verified_at = user.email_verified_at;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        inner.role_users.retain(|(user_id, _)| *user_id != id);
        Ok(inner.users.remove(&id).is_some())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let inner = self.inner.read().await;
        let mut roles = inner.roles.clone();
        roles.sort_by(|a, b| a.hierarchy.cmp(&b.hierarchy).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    async fn seed_roles(&self, config: &RolesConfig) -> StoreResult<Vec<Role>> {
        {
            let mut inner = self.inner.write().await;
            for seed in config.roles() {
                if let Some(role) = inner.roles.iter_mut().find(|r| r.name == seed.name) {
                    role.hierarchy = seed.hierarchy;
                    role.permissions.clone_from(&seed.permissions);
                } else {
                    inner.roles.push(Role {
                        id: Uuid::now_v7(),
                        name: seed.name.clone(),
                        hierarchy: seed.hierarchy,
                        permissions: seed.permissions.clone(),
                    });
                }
            }
        }

        self.list_roles().await
    }

    async fn roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let inner = self.inner.read().await;
        Ok(inner
            .role_users
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, role_id)| inner.roles.iter().find(|r| r.id == *role_id).cloned())
            .collect())
    }

    async fn attach_role(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("User"));
        }
        if !inner.roles.iter().any(|r| r.id == role_id) {
            return Err(StoreError::NotFound("Role"));
        }
        if !inner.role_users.contains(&(user_id, role_id)) {
            inner.role_users.push((user_id, role_id));
        }
        Ok(())
    }

    async fn sync_user_role(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("User"));
        }
        if !inner.roles.iter().any(|r| r.id == role_id) {
            return Err(StoreError::NotFound("Role"));
        }
        inner.role_users.retain(|(uid, _)| *uid != user_id);
        inner.role_users.push((user_id, role_id));
        Ok(())
    }
}

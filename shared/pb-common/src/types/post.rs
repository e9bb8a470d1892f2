//! Post Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag as exposed to clients. Only the name is public.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagResource {
    pub name: String,
}

impl TagResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Public subset of the post owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PostAuthor {
    pub id: Uuid,
    pub name: String,
}

/// Post as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PostResource {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    /// Absolute banner URL, built from the stored relative asset path.
    pub banner: Option<String>,
    pub visible: bool,
    pub private: bool,
    /// `None` when the owner record no longer exists.
    pub user: Option<PostAuthor>,
    pub tags: Vec<TagResource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

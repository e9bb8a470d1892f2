//! Database Models

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User model.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Fields for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
}

/// Post model.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    /// Relative asset path, resolved against the asset base URL on output.
    pub banner: Option<String>,
    pub visible: bool,
    pub private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub banner: Option<String>,
    pub visible: bool,
    pub private: bool,
}

/// Changes applied by a post update.
///
/// Text fields are always replaced; optional fields left as `None` keep the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: String,
    pub description: String,
    pub content: String,
    pub banner: Option<String>,
    pub visible: Option<bool>,
    pub private: Option<bool>,
}

/// Tag model.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Tag row joined to the post it is attached to.
#[derive(Debug, Clone, FromRow)]
pub struct PostTagRow {
    pub post_id: Uuid,
    pub id: Uuid,
    pub name: String,
}

/// One page of posts plus the total number of matches.
#[derive(Debug, Clone, Default)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: i64,
}

/// Normalize a tag list: trim, drop blanks, de-duplicate keeping first occurrence.
#[must_use]
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if !out.iter().any(|existing| existing == name) {
            out.push(name.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_names() {
        let names = vec![
            " rust ".to_string(),
            String::new(),
            "web".to_string(),
            "rust".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(normalize_tag_names(&names), vec!["rust", "web"]);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            password_hash: "secret-hash".into(),
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!user.is_verified());
    }
}

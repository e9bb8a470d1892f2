//! User Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role summary.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RoleResource {
    /// Role ID.
    pub id: Uuid,
    /// Unique role name.
    pub name: String,
    /// Rank in the hierarchy (0 = top).
    pub hierarchy: i32,
}

/// User data for the authenticated user and administrative views.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserResource {
    /// User ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// When the current email was verified.
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Effective role.
    pub role: Option<RoleResource>,
    /// Permission names granted through the effective role.
    pub permissions: Vec<String>,
    /// When user was created.
    pub created_at: DateTime<Utc>,
}

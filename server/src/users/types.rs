//! Request types for users.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Profile update. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "The name must be between 1 and 255 characters."))]
    pub name: Option<String>,

    #[validate(
        email(message = "The email must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: Option<String>,
}

/// Role assignment body.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
}

//! Users module.
//!
//! Profile updates with email re-verification, role assignment guarded by
//! the role hierarchy, and account deletion.

pub mod events;
pub mod handlers;
pub mod service;
pub mod types;

use axum::routing::{get, patch, put};
use axum::Router;

use crate::api::AppState;

pub use events::{EventSender, UserEvent};

/// Router for users (mounted at /api/users).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", patch(handlers::update_user).delete(handlers::delete_user))
        .route("/{id}/role", put(handlers::assign_role))
}

/// Routes for the caller and the role list.
pub fn account_router() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(handlers::me))
        .route("/api/roles", get(handlers::list_roles))
}

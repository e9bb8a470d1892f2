//! Posts module.
//!
//! Blog-style articles with tags, a visibility flag (listed publicly or not)
//! and a privacy flag (readable anonymously or not).

pub mod constants;
pub mod filter;
pub mod handlers;
pub mod types;

use axum::routing::get;
use axum::Router;

use crate::api::AppState;

pub use constants::PAGE_SIZE;
pub use filter::{ExclusionPattern, PostFilter, PostPredicate, SearchTerm};
pub use types::{ListPostsQuery, PostRequest};

/// Router for posts (mounted at /api/posts).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_posts).post(handlers::create_post))
        .route(
            "/{id}",
            get(handlers::show_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/{id}/edit", get(handlers::edit_post))
}

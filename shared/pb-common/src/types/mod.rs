//! Resource Types

mod pagination;
mod post;
mod user;

pub use pagination::{PageMeta, Paginated};
pub use post::{PostAuthor, PostResource, TagResource};
pub use user::{RoleResource, UserResource};

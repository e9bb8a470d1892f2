//! Postboard Server
//!
//! Article publishing backend with tag and full-text filtering and
//! hierarchy-ranked roles.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod permissions;
pub mod posts;
pub mod users;

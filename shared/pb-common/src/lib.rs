//! Postboard Common Library
//!
//! Client-facing resource representations shared by the server and its clients.

pub mod types;

pub use types::*;

//! Authentication
//!
//! Bearer token validation and caller resolution. Token issuance happens
//! elsewhere; this service only consumes tokens.

mod error;
pub mod jwt;
mod middleware;

pub use error::{AuthError, AuthResult};
pub use middleware::{load_auth_user, resolve_auth, AuthUser};

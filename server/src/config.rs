//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// `PostgreSQL` connection URL. When unset the server runs on the in-memory store.
    pub database_url: Option<String>,

    /// JWT signing secret (HS256)
    pub jwt_secret: String,

    /// JWT access token expiry in seconds (default: 3600 = 1 hour)
    pub jwt_access_expiry: i64,

    /// Public base URL that relative banner paths are resolved against
    pub asset_base_url: String,

    /// Optional JSON file overriding the built-in role structure
    pub roles_config_path: Option<String>,

    /// Role applied to users that have no role assignment
    pub default_role: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_access_expiry: env::var("JWT_ACCESS_EXPIRY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            asset_base_url: env::var("ASSET_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/storage".into()),
            roles_config_path: env::var("ROLES_CONFIG_PATH").ok(),
            default_role: env::var("DEFAULT_ROLE").unwrap_or_else(|_| "user".into()),
        })
    }

    /// Check if a `PostgreSQL` database is configured.
    #[must_use]
    pub const fn has_database(&self) -> bool {
        self.database_url.is_some()
    }

    /// Resolve a stored relative asset path into the URL clients see.
    #[must_use]
    pub fn asset_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.asset_base_url.trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }

    /// Create a default configuration for testing.
    ///
    /// Uses the in-memory store. Point `database_url` at a disposable
    /// database to exercise the `PostgreSQL` store instead.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            database_url: None,
            jwt_secret: "test-secret".into(),
            jwt_access_expiry: 900,
            asset_base_url: "http://localhost/storage".into(),
            roles_config_path: None,
            default_role: "user".into(),
        }
    }
}

//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp`, which builds the full axum router over the in-memory
//! store with the default roles seeded, plus user creation, token minting and
//! response parsing.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use postboard_server::api::{create_router, AppState};
use postboard_server::auth::jwt;
use postboard_server::config::Config;
use postboard_server::db::{MemoryStore, NewPost, NewUser, Post, PostStore, RoleStore, Store, UserStore};
use postboard_server::permissions::{Role, RolesConfig};
use postboard_server::users::{events, UserEvent};
use tokio::sync::broadcast;
use tower::ServiceExt;
use uuid::Uuid;

/// Router plus direct handles on its store and event stream.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: Config,
    pub events: broadcast::Receiver<UserEvent>,
}

impl TestApp {
    /// Create a test app with the default roles seeded.
    pub async fn new() -> Self {
        let config = Config::default_for_test();
        let roles = RolesConfig::default();
        let store = Arc::new(MemoryStore::new());
        store.seed_roles(&roles).await.expect("Failed to seed roles");

        let (sender, events) = events::channel();
        let shared: Arc<dyn Store> = store.clone();
        let state = AppState::new(shared, config.clone(), roles, sender);

        Self {
            router: create_router(state),
            store,
            config,
            events,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// GET with an optional bearer token.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Self::request(Method::GET, uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.oneshot(builder.body(Body::empty()).unwrap()).await
    }

    /// Send a JSON body with a bearer token.
    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Response<Body> {
        let req = Self::request(method, uri)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap();
        self.oneshot(req).await
    }

    /// DELETE with a bearer token.
    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        let req = Self::request(Method::DELETE, uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.oneshot(req).await
    }

    /// Seeded role by name.
    pub async fn role(&self, name: &str) -> Role {
        self.store
            .find_role_by_name(name)
            .await
            .expect("Role query failed")
            .expect("Role not seeded")
    }

    /// Create a verified user holding `role` (or no role) and mint a token.
    pub async fn create_user(&self, email: &str, role: Option<&str>) -> (Uuid, String) {
        let user = self
            .store
            .create_user(NewUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                password_hash: "hash".into(),
                email_verified_at: Some(Utc::now()),
            })
            .await
            .expect("Failed to create test user");

        if let Some(name) = role {
            let role = self.role(name).await;
            self.store
                .attach_role(user.id, role.id)
                .await
                .expect("Failed to attach role");
        }

        (user.id, self.token(user.id))
    }

    /// Access token for a user.
    pub fn token(&self, user_id: Uuid) -> String {
        jwt::generate_access_token(user_id, &self.config.jwt_secret, self.config.jwt_access_expiry)
            .expect("Failed to generate token")
    }

    /// Insert a post directly, bypassing the API.
    pub async fn create_post(&self, user_id: Uuid, title: &str, content: &str, tags: &[&str]) -> Post {
        self.insert_post(
            NewPost {
                user_id,
                title: title.into(),
                description: "A short description".into(),
                content: content.into(),
                banner: None,
                visible: true,
                private: false,
            },
            tags,
        )
        .await
    }

    pub async fn insert_post(&self, post: NewPost, tags: &[&str]) -> Post {
        let tags: Vec<String> = tags.iter().map(|t| (*t).to_string()).collect();
        self.store
            .create_post(post, &tags)
            .await
            .expect("Failed to create post")
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

/// Titles of the posts in a listing response, in order.
pub fn titles(json: &serde_json::Value) -> Vec<String> {
    json["data"]
        .as_array()
        .expect("data should be an array")
        .iter()
        .map(|p| p["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

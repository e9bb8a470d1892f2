//! HTTP Integration Tests for Users and Roles
//!
//! Role assignment against the role hierarchy, profile updates with email
//! re-verification, account deletion and the role listing.
//!
//! Run with: `cargo test --test users_http_test -- --nocapture`

mod helpers;

use axum::http::Method;
use helpers::{body_to_json, TestApp};
use postboard_server::db::{RoleStore, UserStore};
use postboard_server::users::UserEvent;
use serde_json::json;
use uuid::Uuid;

const HIERARCHY_MESSAGE: &str = "The role_id have a higher hierarchy than the allowed.";

async fn assign(app: &TestApp, token: &str, user_id: Uuid, role: &str) -> axum::http::Response<axum::body::Body> {
    let role_id = app.role(role).await.id;
    app.send_json(
        Method::PUT,
        &format!("/api/users/{user_id}/role"),
        token,
        &json!({ "role_id": role_id }),
    )
    .await
}

// ============================================================================
// Role Assignment
// ============================================================================

#[tokio::test]
async fn test_top_of_hierarchy_assigns_any_role() {
    let app = TestApp::new().await;
    let (_, root) = app.create_user("root@example.com", Some("superadmin")).await;
    let (member, _) = app.create_user("member@example.com", Some("user")).await;

    let resp = assign(&app, &root, member, "superadmin").await;
    assert_eq!(resp.status(), 200);
    let json = body_to_json(resp).await;
    assert_eq!(json["role"]["name"], "superadmin");
    assert_eq!(json["role"]["hierarchy"], 0);

    let roles = app.store.roles_for_user(member).await.expect("Query failed");
    assert_eq!(roles.len(), 1);
}

#[tokio::test]
async fn test_assigning_higher_role_is_rejected() {
    let app = TestApp::new().await;
    let (_, admin) = app.create_user("admin@example.com", Some("admin")).await;
    let (member, _) = app.create_user("member@example.com", Some("user")).await;

    let resp = assign(&app, &admin, member, "superadmin").await;
    assert_eq!(resp.status(), 422);
    let json = body_to_json(resp).await;
    assert_eq!(json["errors"]["role_id"][0], HIERARCHY_MESSAGE);

    // Nothing changed.
    let roles = app.store.roles_for_user(member).await.expect("Query failed");
    assert_eq!(roles[0].name, "user");
}

#[tokio::test]
async fn test_assigning_own_or_lower_role_is_allowed() {
    let app = TestApp::new().await;
    let (_, admin) = app.create_user("admin@example.com", Some("admin")).await;
    let (member, _) = app.create_user("member@example.com", Some("user")).await;

    let resp = assign(&app, &admin, member, "admin").await;
    assert_eq!(resp.status(), 200);

    let resp = assign(&app, &admin, member, "editor").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_to_json(resp).await["role"]["name"], "editor");
}

#[tokio::test]
async fn test_role_assignment_requires_update_users() {
    let app = TestApp::new().await;
    let (_, editor) = app.create_user("editor@example.com", Some("editor")).await;
    let (member, _) = app.create_user("member@example.com", Some("user")).await;

    let resp = assign(&app, &editor, member, "user").await;
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_unknown_role_is_not_found() {
    let app = TestApp::new().await;
    let (_, root) = app.create_user("root@example.com", Some("superadmin")).await;
    let (member, _) = app.create_user("member@example.com", Some("user")).await;

    let resp = app
        .send_json(
            Method::PUT,
            &format!("/api/users/{member}/role"),
            &root,
            &json!({ "role_id": Uuid::now_v7() }),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_missing_role_id_is_validation_error() {
    let app = TestApp::new().await;
    let (_, root) = app.create_user("root@example.com", Some("superadmin")).await;
    let (member, _) = app.create_user("member@example.com", Some("user")).await;

    let resp = app
        .send_json(Method::PUT, &format!("/api/users/{member}/role"), &root, &json!({}))
        .await;
    assert_eq!(resp.status(), 422);
    let json = body_to_json(resp).await;
    assert_eq!(json["error"], "VALIDATION_ERROR");
    assert!(json["errors"]["body"].is_array());
}

// ============================================================================
// Profile
// ============================================================================

#[tokio::test]
async fn test_me_reports_role_and_permissions() {
    let app = TestApp::new().await;
    let (id, token) = app.create_user("editor@example.com", Some("editor")).await;

    let resp = app.get("/api/me", Some(&token)).await;
    assert_eq!(resp.status(), 200);
    let json = body_to_json(resp).await;
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["role"]["name"], "editor");
    let permissions = json["permissions"].as_array().expect("permissions");
    assert!(permissions.contains(&json!("create-posts")));
    assert!(!permissions.contains(&json!("update-users")));

    assert_eq!(app.get("/api/me", None).await.status(), 401);
}

#[tokio::test]
async fn test_user_without_role_acts_with_default_role() {
    let app = TestApp::new().await;
    let (_, token) = app.create_user("fresh@example.com", None).await;

    let json = body_to_json(app.get("/api/me", Some(&token)).await).await;
    assert_eq!(json["role"]["name"], "user");
}

#[tokio::test]
async fn test_changing_email_clears_verification() {
    let mut app = TestApp::new().await;
    let (id, token) = app.create_user("member@example.com", Some("user")).await;

    let resp = app
        .send_json(
            Method::PATCH,
            &format!("/api/users/{id}"),
            &token,
            &json!({ "email": "new@example.com" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let json = body_to_json(resp).await;
    assert_eq!(json["email"], "new@example.com");
    assert!(json["email_verified_at"].is_null());

    let event = app.events.try_recv().expect("event should be published");
    assert_eq!(
        event,
        UserEvent::VerificationRequested {
            user_id: id,
            email: "new@example.com".into(),
        }
    );
}

#[tokio::test]
async fn test_renaming_keeps_verification() {
    let mut app = TestApp::new().await;
    let (id, token) = app.create_user("member@example.com", Some("user")).await;

    let resp = app
        .send_json(
            Method::PATCH,
            &format!("/api/users/{id}"),
            &token,
            &json!({ "name": "Renamed", "email": "member@example.com" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let json = body_to_json(resp).await;
    assert_eq!(json["name"], "Renamed");
    assert!(json["email_verified_at"].is_string());
    assert!(app.events.try_recv().is_err());
}

#[tokio::test]
async fn test_updating_another_user_requires_capability() {
    let app = TestApp::new().await;
    let (_, reader) = app.create_user("reader@example.com", Some("user")).await;
    let (_, admin) = app.create_user("admin@example.com", Some("admin")).await;
    let (other, _) = app.create_user("other@example.com", Some("user")).await;
    let body = json!({ "name": "Changed" });

    let resp = app
        .send_json(Method::PATCH, &format!("/api/users/{other}"), &reader, &body)
        .await;
    assert_eq!(resp.status(), 403);

    let resp = app
        .send_json(Method::PATCH, &format!("/api/users/{other}"), &admin, &body)
        .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_email_taken_by_another_user() {
    let app = TestApp::new().await;
    let (id, token) = app.create_user("member@example.com", Some("user")).await;
    app.create_user("taken@example.com", Some("user")).await;

    let resp = app
        .send_json(
            Method::PATCH,
            &format!("/api/users/{id}"),
            &token,
            &json!({ "email": "taken@example.com" }),
        )
        .await;
    assert_eq!(resp.status(), 422);
    assert!(body_to_json(resp).await["errors"]["email"].is_array());
}

// ============================================================================
// Deletion and Roles
// ============================================================================

#[tokio::test]
async fn test_delete_user_revokes_roles() {
    let app = TestApp::new().await;
    let (_, admin) = app.create_user("admin@example.com", Some("admin")).await;
    let (_, reader) = app.create_user("reader@example.com", Some("user")).await;
    let (member, _) = app.create_user("member@example.com", Some("editor")).await;

    let resp = app.delete(&format!("/api/users/{member}"), &reader).await;
    assert_eq!(resp.status(), 403);

    let resp = app.delete(&format!("/api/users/{member}"), &admin).await;
    assert_eq!(resp.status(), 204);
    assert!(app.store.find_user(member).await.expect("Query failed").is_none());
    assert!(app
        .store
        .roles_for_user(member)
        .await
        .expect("Query failed")
        .is_empty());

    let resp = app.delete(&format!("/api/users/{member}"), &admin).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_list_roles_top_first() {
    let app = TestApp::new().await;
    let (_, admin) = app.create_user("admin@example.com", Some("admin")).await;
    let (_, reader) = app.create_user("reader@example.com", Some("user")).await;

    assert_eq!(app.get("/api/roles", Some(&reader)).await.status(), 403);

    let json = body_to_json(app.get("/api/roles", Some(&admin)).await).await;
    let names: Vec<&str> = json
        .as_array()
        .expect("roles")
        .iter()
        .map(|r| r["name"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(names, ["superadmin", "admin", "editor", "user"]);
}

#[tokio::test]
async fn test_health_reports_store_and_roles() {
    let app = TestApp::new().await;

    let json = body_to_json(app.get("/health", None).await).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], false);
    assert_eq!(json["roles"], 4);
}

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{TestApp, PASSWORD};
use helpdesk_api::types::Role;

#[tokio::test]
async fn health_and_ping_are_public() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.get("/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = app.get("/api/ping", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pong"], true);
    Ok(())
}

#[tokio::test]
async fn register_creates_organization_and_admin() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "name": "Admin User",
                "email": "Admin@Campus.edu",
                "password": PASSWORD,
                "organizationName": "Campus Facilities",
                "domain": "campus.edu"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);

    let user = &body["data"]["user"];
    assert_eq!(user["role"], "admin");
    assert_eq!(user["email"], "admin@campus.edu");
    assert_eq!(user["permissions"], json!(["all"]));
    assert!(user.get("passwordHash").is_none());
    assert_eq!(user["organizationId"], body["data"]["organization"]["id"]);

    let token = body["data"]["token"].as_str().unwrap();
    let (status, me) = app.get("/api/auth/me", Some(token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["organization"]["domain"], "campus.edu");
    Ok(())
}

#[tokio::test]
async fn register_rejects_duplicate_domain_and_weak_password() -> Result<()> {
    let app = TestApp::new();
    app.organization("Campus Facilities", "campus.edu", None).await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "name": "Someone",
                "email": "someone@campus.edu",
                "password": PASSWORD,
                "organizationName": "Campus Again",
                "domain": "CAMPUS.edu"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "name": "Someone",
                "email": "someone@other.edu",
                "password": "short",
                "organizationName": "Other",
                "domain": "other.edu"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_flow() -> Result<()> {
    let app = TestApp::new();
    let org = app.organization("Campus Facilities", "campus.edu", None).await;
    app.user("sarah.wilson@campus.edu", Role::Staff, Some(&org.id)).await;

    let (status, _) = app.post("/api/auth/login", None, json!({ "email": "sarah.wilson@campus.edu" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "sarah.wilson@campus.edu", "password": "wrong-password" }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");

    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": "nobody@campus.edu", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "Sarah.Wilson@campus.edu", "password": PASSWORD }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["role"], "staff");
    assert_eq!(body["data"]["expiresIn"], 3600);

    let token = body["data"]["token"].as_str().unwrap();
    let (status, _) = app.get("/api/auth/me", Some(token)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_valid_token() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.get("/api/auth/me", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/auth/me", Some("not.a.token")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn deleted_or_deactivated_users_are_rejected() -> Result<()> {
    let app = TestApp::new();
    let org = app.organization("Campus Facilities", "campus.edu", None).await;

    let mut inactive = app.user("gone@campus.edu", Role::Admin, Some(&org.id)).await;
    let token = app.token(&inactive);
    inactive.is_active = false;
    app.store.put_user(inactive).await;

    let (status, _) = app.get("/api/auth/me", Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let other = app.organization("Elsewhere", "elsewhere.edu", None).await;
    let mut ghost = app.user("ghost@campus.edu", Role::Student, Some(&org.id)).await;
    ghost.id = "never-stored".into();
    ghost.organization_id = Some(other.id);
    let (status, body) = app.get("/api/auth/me", Some(&app.token(&ghost))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "The user belonging to this token no longer exists.");
    Ok(())
}

#[tokio::test]
async fn stale_tokens_are_rejected() -> Result<()> {
    let app = TestApp::new();
    let org = app.organization("Campus Facilities", "campus.edu", None).await;

    // Role changed after the token was issued
    let mut demoted = app.user("demoted@campus.edu", Role::Admin, Some(&org.id)).await;
    let token = app.token(&demoted);
    demoted.role = Role::Student;
    app.store.put_user(demoted).await;
    let (status, _) = app.get("/api/auth/me", Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Password changed after the token was issued
    let mut changed = app.user("changed@campus.edu", Role::Staff, Some(&org.id)).await;
    let token = app.token(&changed);
    changed.password_changed_at = Some(Utc::now() + Duration::minutes(1));
    app.store.put_user(changed).await;
    let (status, body) = app.get("/api/auth/me", Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User recently changed password! Please log in again.");
    Ok(())
}

#[tokio::test]
async fn unreadable_stored_hash_is_a_failed_login() -> Result<()> {
    let app = TestApp::new();
    let org = app.organization("Campus Facilities", "campus.edu", None).await;
    let mut legacy = app.user("legacy@campus.edu", Role::Staff, Some(&org.id)).await;
    legacy.password_hash = "not-an-argon2-hash".into();
    app.store.put_user(legacy).await;

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": "legacy@campus.edu", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": "nobody@campus.edu", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");
    Ok(())
}

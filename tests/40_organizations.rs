mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use helpdesk_api::types::Role;

#[tokio::test]
async fn admin_creates_organization_once_per_domain() -> Result<()> {
    let app = TestApp::new();
    let org = app.organization("Campus Facilities", "campus.edu", None).await;
    let admin = app.token(&app.user("admin@campus.edu", Role::Admin, Some(&org.id)).await);

    let body = json!({ "name": "Annex", "domain": "annex.campus.edu", "boardId": "campus-board" });
    let (status, created) = app.post("/api/organizations", Some(&admin), body.clone()).await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["data"]["boardId"], "campus-board");
    assert_eq!(created["data"]["subscription"], "free");

    let (status, _) = app.post("/api/organizations", Some(&admin), body).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post("/api/organizations", Some(&admin), json!({ "name": "No domain" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn admin_reads_only_own_organization() -> Result<()> {
    let app = TestApp::new();
    let org = app.organization("Campus Facilities", "campus.edu", None).await;
    let other = app.organization("Elsewhere", "elsewhere.edu", None).await;
    let admin = app.token(&app.user("admin@campus.edu", Role::Admin, Some(&org.id)).await);
    let student = app.token(&app.user("alex@campus.edu", Role::Student, Some(&org.id)).await);

    let (status, body) = app.get(&format!("/api/organizations/{}", org.id), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Campus Facilities");

    let (status, _) = app.get(&format!("/api/organizations/{}", other.id), Some(&admin)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/api/organizations/{}", org.id), Some(&student)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn only_superadmin_updates_and_deletes() -> Result<()> {
    let app = TestApp::new();
    let org = app.organization("Campus Facilities", "campus.edu", None).await;
    let admin = app.token(&app.user("admin@campus.edu", Role::Admin, Some(&org.id)).await);
    let root = app.token(&app.user("root@campus.edu", Role::Superadmin, Some(&org.id)).await);
    let target = app.organization("North Campus", "north.campus.edu", None).await;
    let uri = format!("/api/organizations/{}", target.id);

    let (status, _) = app.patch(&uri, Some(&admin), json!({ "subscription": "premium" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(&uri, Some(&root), json!({ "subscription": "premium", "boardId": "campus-board" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["subscription"], "premium");
    assert_eq!(body["data"]["boardId"], "campus-board");
    assert_eq!(body["data"]["name"], "North Campus");

    let (status, _) = app.patch(&uri, Some(&root), json!({ "domain": "campus.edu" })).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.delete(&uri, Some(&admin)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&root)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&uri, Some(&root)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn board_listing_is_limited_to_own_board() -> Result<()> {
    let app = TestApp::new();
    let north = app.organization("North Campus", "north.campus.edu", Some("campus-board")).await;
    app.organization("South Campus", "south.campus.edu", Some("campus-board")).await;
    let downtown = app.organization("Downtown", "downtown.edu", Some("city-board")).await;

    let board_admin = app.token(&app.user("board@north.campus.edu", Role::BoardAdmin, Some(&north.id)).await);
    let admin = app.token(&app.user("admin@north.campus.edu", Role::Admin, Some(&north.id)).await);
    let root = app.token(&app.user("root@downtown.edu", Role::Superadmin, Some(&downtown.id)).await);

    let (status, body) = app.get("/api/boards/campus-board/organizations", Some(&board_admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["name"], "North Campus");

    let (status, _) = app.get("/api/boards/city-board/organizations", Some(&board_admin)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/boards/campus-board/organizations", Some(&admin)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/boards/city-board/organizations", Some(&root)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    Ok(())
}

#[tokio::test]
async fn staff_directory_respects_organization_access() -> Result<()> {
    let app = TestApp::new();
    let north = app.organization("North Campus", "north.campus.edu", Some("campus-board")).await;
    let south = app.organization("South Campus", "south.campus.edu", Some("campus-board")).await;
    app.user("sarah.wilson@north.campus.edu", Role::Staff, Some(&north.id)).await;
    app.user("sam@south.campus.edu", Role::Staff, Some(&south.id)).await;
    app.user("alex@north.campus.edu", Role::Student, Some(&north.id)).await;

    let admin = app.token(&app.user("admin@north.campus.edu", Role::Admin, Some(&north.id)).await);
    let board_admin = app.token(&app.user("board@north.campus.edu", Role::BoardAdmin, Some(&north.id)).await);
    let staff = app.token(&app.user("other.staff@north.campus.edu", Role::Staff, Some(&north.id)).await);

    let (status, body) = app.get("/api/users/staff", Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, _) = app
        .get(&format!("/api/users/staff?organizationId={}", south.id), Some(&admin))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .get(
            &format!("/api/users/staff?organizationId={}&boardId=campus-board", south.id),
            Some(&board_admin),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["email"], "sam@south.campus.edu");

    let (status, _) = app.get("/api/users/staff", Some(&staff)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn deleting_organization_removes_tickets_and_detaches_members() -> Result<()> {
    let app = TestApp::new();
    let home = app.organization("Platform", "platform.edu", None).await;
    let org = app.organization("Campus Facilities", "campus.edu", None).await;
    let root = app.token(&app.user("root@platform.edu", Role::Superadmin, Some(&home.id)).await);
    let student = app.user("alex@campus.edu", Role::Student, Some(&org.id)).await;
    let student_token = app.token(&student);
    app.ticket("Broken AC in Room 101", &org.id, &student).await;

    let (status, body) = app.get(&format!("/api/tickets?organizationId={}", org.id), Some(&root)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = app.delete(&format!("/api/organizations/{}", org.id), Some(&root)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/api/tickets?organizationId={}", org.id), Some(&root)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    // The member's token still names the deleted organization
    let (status, _) = app.get("/api/auth/me", Some(&student_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn superadmin_detaches_organization_from_board() -> Result<()> {
    let app = TestApp::new();
    let north = app.organization("North Campus", "north.campus.edu", Some("campus-board")).await;
    app.organization("South Campus", "south.campus.edu", Some("campus-board")).await;
    let root = app.token(&app.user("root@north.campus.edu", Role::Superadmin, Some(&north.id)).await);
    let uri = format!("/api/organizations/{}", north.id);

    let (status, body) = app.patch(&uri, Some(&root), json!({ "theme": "dark" })).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["boardId"], "campus-board");

    let (status, body) = app.patch(&uri, Some(&root), json!({ "boardId": null })).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["boardId"].is_null());

    let (status, body) = app.get("/api/boards/campus-board/organizations", Some(&root)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "South Campus");
    Ok(())
}

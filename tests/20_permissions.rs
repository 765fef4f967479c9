mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::*;

#[tokio::test]
async fn platform_admin_edits_team_created_child() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = app
        .put(CHILD_C, &token(PLATFORM_ADMIN), json!({ "organization": { "name": "Renamed C" } }))
        .await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["organization"]["name"], "Renamed C");
    Ok(())
}

#[tokio::test]
async fn platform_admin_manages_own_organization() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, _) = app.get(PLATFORM_ORG, &token(PLATFORM_ADMIN)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn platform_admin_cannot_touch_foreign_child() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = app.get(CHILD_B, &token(PLATFORM_ADMIN)).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ORGANIZATION_SCOPE");
    // Nothing about the target leaks into the denial
    assert!(body.get("data").is_none());
    Ok(())
}

#[tokio::test]
async fn general_admin_is_scoped_to_their_team() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (own, _) = app.get(GENERAL_ORG, &token(GENERAL_ADMIN)).await?;
    assert_eq!(own, StatusCode::OK);

    let (other, body) = app.get(CHILD_C, &token(GENERAL_ADMIN)).await?;
    assert_eq!(other, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ORGANIZATION_SCOPE");
    Ok(())
}

#[tokio::test]
async fn platform_non_admin_needs_admin_role() -> Result<()> {
    let app = TestApp::spawn().await?;

    for user in [PLATFORM_MEMBER, PLATFORM_CREATOR] {
        let (status, body) = app.get(PLATFORM_ORG, &token(user)).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ROLE_REQUIRED");
    }
    Ok(())
}

#[tokio::test]
async fn child_member_cannot_write_another_organization() -> Result<()> {
    let app = TestApp::spawn().await?;

    for user in [CHILD_A_ADMIN, CHILD_A_MEMBER] {
        let (status, body) = app
            .put(CHILD_B, &token(user), json!({ "organization": { "name": "Hijacked" } }))
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ORGANIZATION_SCOPE");
    }

    let (_, child_b) = app.get(CHILD_B, SERVICE_KEY).await?;
    assert_eq!(child_b["data"]["organization"]["name"], "Child B");
    Ok(())
}

#[tokio::test]
async fn child_member_writes_own_organization() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = app
        .put(CHILD_A, &token(CHILD_A_MEMBER), json!({ "faqs": [{ "question": "Open on Sunday?" }] }))
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["faqs"][0]["question"], "Open on Sunday?");
    Ok(())
}

#[tokio::test]
async fn child_role_outside_admin_and_member_is_refused() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (read, body) = app.get(CHILD_A, &token(CHILD_A_VIEWER)).await?;
    assert_eq!(read, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ROLE_REQUIRED");

    let (write, _) = app.put(CHILD_A, &token(CHILD_A_VIEWER), json!({ "faqs": [] })).await?;
    assert_eq!(write, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn missing_target_is_not_found() -> Result<()> {
    let app = TestApp::spawn().await?;
    let missing = "00000000-0000-0000-0000-00000000dead";

    let (status, body) = app.get(missing, &token(PLATFORM_ADMIN)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app.get(missing, SERVICE_KEY).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

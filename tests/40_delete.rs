mod common;

use anyhow::Result;
use axum::http::StatusCode;

use orgsync_api::database::models::tables;

use common::*;

#[tokio::test]
async fn platform_admin_deletes_team_created_child() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = app.delete(CHILD_C, &token(PLATFORM_ADMIN)).await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["id"], CHILD_C);
    assert_eq!(body["data"]["name"], "Child C");

    let (after, _) = app.get(CHILD_C, SERVICE_KEY).await?;
    assert_eq!(after, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn organization_cannot_delete_itself() -> Result<()> {
    let app = TestApp::spawn().await?;

    for (org, user) in [(PLATFORM_ORG, PLATFORM_ADMIN), (GENERAL_ORG, GENERAL_ADMIN)] {
        let (status, body) = app.delete(org, &token(user)).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "SELF_DELETE");
    }
    Ok(())
}

#[tokio::test]
async fn child_users_never_delete() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (own, body) = app.delete(CHILD_A, &token(CHILD_A_ADMIN)).await?;
    assert_eq!(own, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ROLE_REQUIRED");

    let (other, body) = app.delete(CHILD_C, &token(CHILD_A_ADMIN)).await?;
    assert_eq!(other, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ORGANIZATION_SCOPE");
    Ok(())
}

#[tokio::test]
async fn foreign_child_is_out_of_scope() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = app.delete(CHILD_B, &token(PLATFORM_ADMIN)).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ORGANIZATION_SCOPE");
    Ok(())
}

#[tokio::test]
async fn referenced_organization_is_a_conflict() -> Result<()> {
    let app = TestApp::spawn().await?;

    // Child A still has member profiles pointing at it
    let (status, body) = app.delete(CHILD_A, &token(PLATFORM_ADMIN)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (still_there, _) = app.get(CHILD_A, SERVICE_KEY).await?;
    assert_eq!(still_there, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn service_delete_of_missing_organization_is_not_found() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = app.delete("00000000-0000-0000-0000-00000000dead", SERVICE_KEY).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn delete_is_recorded_in_the_activity_log() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, _) = app.delete(CHILD_C, &token(PLATFORM_ADMIN)).await?;
    assert_eq!(status, StatusCode::OK);

    let logs = app.wait_for_rows(tables::ACTIVITY_LOGS, |rows| !rows.is_empty()).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["action"], "organization_deleted");
    assert_eq!(logs[0]["organization_id"], CHILD_C);
    assert_eq!(logs[0]["user_email"], "platform-admin@example.test");
    Ok(())
}

#[tokio::test]
async fn activity_log_can_be_disabled() -> Result<()> {
    let app = TestApp::spawn_with(|config| config.notify.activity_log_enabled = false).await?;
    let (status, _) = app.delete(CHILD_C, &token(PLATFORM_ADMIN)).await?;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(app.store.rows(tables::ACTIVITY_LOGS).await.is_empty());
    Ok(())
}

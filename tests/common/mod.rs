#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use orgsync_api::app::{router, AppState};
use orgsync_api::auth::{generate_jwt, Claims};
use orgsync_api::config::{AppConfig, KeyPolicy};
use orgsync_api::database::models::tables;
use orgsync_api::database::{MemoryStore, Row};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const SERVICE_KEY: &str = "integration-service-key";

pub const PLATFORM_ORG: &str = "00000000-0000-0000-0000-000000000001";
pub const GENERAL_ORG: &str = "00000000-0000-0000-0000-000000000002";
/// Child created by the platform admin; has profiles of its own
pub const CHILD_A: &str = "00000000-0000-0000-0000-0000000000a1";
/// Child created by someone outside the platform team
pub const CHILD_B: &str = "00000000-0000-0000-0000-0000000000b1";
/// Child created by the platform's site creator; no profiles
pub const CHILD_C: &str = "00000000-0000-0000-0000-0000000000c1";

pub const PLATFORM_ADMIN: &str = "platform-admin";
pub const PLATFORM_MEMBER: &str = "platform-member";
pub const PLATFORM_CREATOR: &str = "platform-creator";
pub const GENERAL_ADMIN: &str = "general-admin";
pub const CHILD_A_ADMIN: &str = "child-a-admin";
pub const CHILD_A_MEMBER: &str = "child-a-member";
pub const CHILD_A_VIEWER: &str = "child-a-viewer";
pub const HOMELESS: &str = "homeless";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let mut config = AppConfig::development();
        config.security.jwt_secret = JWT_SECRET.to_string();
        config.security.service_credential = SERVICE_KEY.to_string();
        config.notify.revalidate_url = None;
        configure(&mut config);

        let store = Arc::new(MemoryStore::with_site_schema());
        seed_world(&store).await;

        let state = AppState::build(store.clone(), &config)?;
        Ok(Self {
            store,
            router: router(state, &config),
        })
    }

    pub async fn reissuing_menus() -> Result<Self> {
        Self::spawn_with(|config| config.sync.menu_key_policy = KeyPolicy::Reissue).await
    }

    pub async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let body = match body {
            Some(value) => Some(serde_json::to_string(&value)?),
            None => None,
        };
        self.send_raw(method, path, token, body).await
    }

    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(text) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(text)
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, json))
    }

    pub async fn get(&self, org: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, &org_path(org), Some(token), None).await
    }

    pub async fn put(&self, org: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, &org_path(org), Some(token), Some(body)).await
    }

    pub async fn delete(&self, org: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, &org_path(org), Some(token), None).await
    }

    /// Poll a table until `predicate` holds; side effects land on a detached task
    pub async fn wait_for_rows(&self, table: &str, predicate: impl Fn(&[Row]) -> bool) -> Vec<Row> {
        for _ in 0..50 {
            let rows = self.store.rows(table).await;
            if predicate(&rows) {
                return rows;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.store.rows(table).await
    }
}

pub fn org_path(org: &str) -> String {
    format!("/api/organizations/{}", org)
}

pub fn token(user_id: &str) -> String {
    let claims = Claims::new(
        user_id,
        Some(format!("{}@example.test", user_id)),
        None,
        chrono::Duration::minutes(10),
    );
    generate_jwt(JWT_SECRET, &claims).expect("failed to mint test token")
}

async fn seed_world(store: &MemoryStore) {
    store
        .seed(
            tables::ORGANIZATIONS,
            vec![
                json!({ "id": PLATFORM_ORG, "name": "Platform", "type": "platform", "created_by_email": null }),
                json!({ "id": GENERAL_ORG, "name": "Agency", "type": "general", "created_by_email": null }),
                json!({ "id": CHILD_A, "name": "Child A", "type": "child", "created_by_email": "platform-admin@example.test" }),
                json!({ "id": CHILD_B, "name": "Child B", "type": "child", "created_by_email": "stranger@elsewhere.test" }),
                json!({ "id": CHILD_C, "name": "Child C", "type": "child", "created_by_email": "platform-creator@example.test" }),
            ],
        )
        .await;

    let profile = |id: &str, org: Option<&str>, role: &str, creator: bool| {
        json!({
            "id": id,
            "organization_id": org,
            "role": role,
            "is_site_creator": creator,
            "email": format!("{}@example.test", id),
        })
    };
    store
        .seed(
            tables::PROFILES,
            vec![
                profile(PLATFORM_ADMIN, Some(PLATFORM_ORG), "admin", false),
                profile(PLATFORM_MEMBER, Some(PLATFORM_ORG), "member", false),
                profile(PLATFORM_CREATOR, Some(PLATFORM_ORG), "member", true),
                profile(GENERAL_ADMIN, Some(GENERAL_ORG), "admin", false),
                profile(CHILD_A_ADMIN, Some(CHILD_A), "admin", false),
                profile(CHILD_A_MEMBER, Some(CHILD_A), "member", false),
                profile(CHILD_A_VIEWER, Some(CHILD_A), "viewer", false),
                profile(HOMELESS, None, "member", false),
            ],
        )
        .await;

    store
        .seed(
            tables::COOKIE_CATEGORIES,
            vec![json!({ "id": 1, "name": "Essential" }), json!({ "id": 2, "name": "Analytics" })],
        )
        .await;
}

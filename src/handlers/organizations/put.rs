// handlers/organizations/put.rs - PUT /api/organizations/:id handler

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};

/// Saves the submitted snapshot and answers with the same document GET returns.
/// The per-collection sync report goes under `meta.sync`.
pub async fn organization_put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = body?;
    let (document, report) = state.organizations.write(&identity, &id, body).await?;
    Ok(ApiResponse::success(document).with_meta(json!({ "sync": report.collections })))
}

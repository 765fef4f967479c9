// handlers/organizations/get.rs - GET /api/organizations/:id handler

use axum::extract::{Extension, Path, State};
use serde_json::Value;

use crate::app::AppState;
use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn organization_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let document = state.organizations.read(&identity, &id).await?;
    Ok(ApiResponse::success(document))
}

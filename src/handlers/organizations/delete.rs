// handlers/organizations/delete.rs - DELETE /api/organizations/:id handler

use axum::extract::{Extension, Path, State};

use crate::app::AppState;
use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::DeletedOrganization;

pub async fn organization_delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<DeletedOrganization> {
    let deleted = state.organizations.delete(&identity, &id).await?;
    Ok(ApiResponse::success(deleted))
}

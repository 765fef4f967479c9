// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::access::{AccessError, Denial};
use crate::auth::AuthError;
use crate::database::StoreError;
use crate::sync::{SyncError, SyncFailure};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    RoleRequired(String),
    OrganizationScope(String),
    SelfDelete(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    SyncFailed {
        message: String,
        collection: &'static str,
        completed: Vec<&'static str>,
    },
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::RoleRequired(_) => 403,
            ApiError::OrganizationScope(_) => 403,
            ApiError::SelfDelete(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::SyncFailed { .. } => 500,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::RoleRequired(msg) => msg,
            ApiError::OrganizationScope(msg) => msg,
            ApiError::SelfDelete(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::SyncFailed { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::SyncFailed { message, collection, completed } => json!({
                "error": true,
                "message": message,
                "code": self.error_code(),
                "collection": collection,
                "completed": completed
            }),
            _ => json!({
                "error": true,
                "message": self.message(),
                "code": self.error_code()
            }),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::RoleRequired(_) => "ROLE_REQUIRED",
            ApiError::OrganizationScope(_) => "ORGANIZATION_SCOPE",
            ApiError::SelfDelete(_) => "SELF_DELETE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::SyncFailed { .. } => "SYNC_FAILED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConfigured => {
                tracing::error!("Bearer verification requested but no verifier is configured");
                ApiError::service_unavailable("Authentication is not configured")
            }
            AuthError::InvalidToken(detail) => {
                tracing::debug!("Rejected token: {}", detail);
                ApiError::unauthorized("Invalid token")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Denied(Denial::RoleRequired) => {
                ApiError::RoleRequired("Access denied. Your role does not permit this operation.".to_string())
            }
            AccessError::Denied(Denial::OrganizationScope) => ApiError::OrganizationScope(
                "Access denied. You can only manage your own organization or organizations created by your team."
                    .to_string(),
            ),
            AccessError::Denied(Denial::SelfDelete) => {
                ApiError::SelfDelete("An organization cannot delete itself.".to_string())
            }
            AccessError::ProfileNotFound => ApiError::not_found("Profile not found"),
            AccessError::NoOrganization => ApiError::forbidden("User must belong to an organization"),
            AccessError::TargetNotFound(_) => ApiError::not_found("Organization not found"),
            AccessError::OwnOrganizationMissing => ApiError::internal_server_error("Could not verify organization"),
            AccessError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ReferentialIntegrity { table, message } => {
                tracing::info!("Referential integrity conflict on {}: {}", table, message);
                ApiError::conflict("The record is still referenced by other data")
            }
            StoreError::NotFound(what) => ApiError::not_found(what),
            StoreError::Sqlx(sqlx::Error::PoolTimedOut) | StoreError::Sqlx(sqlx::Error::PoolClosed) => {
                tracing::error!("Database pool unavailable");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Don't expose internal store errors to clients
                tracing::error!("Store error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InvalidPayload(msg) => ApiError::invalid_json(msg),
            SyncError::OrganizationMissing(_) => ApiError::not_found("Organization not found"),
            SyncError::Store { source, .. } => source.into(),
        }
    }
}

impl From<SyncFailure> for ApiError {
    fn from(failure: SyncFailure) -> Self {
        let message = match &failure.source {
            SyncError::OrganizationMissing(_) => "Organization not found while saving".to_string(),
            _ => format!("Failed to save {}", failure.collection),
        };
        tracing::error!(
            "Save stopped at {} after {:?}: {}",
            failure.collection,
            failure.completed,
            failure.source
        );
        ApiError::SyncFailed {
            message,
            collection: failure.collection,
            completed: failure.completed,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

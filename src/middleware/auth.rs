use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::app::AppState;
use crate::auth::{AuthError, Identity};
use crate::error::ApiError;

/// Bearer authentication middleware: resolves the credential and injects the [`Identity`]
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;
    let identity = state.resolver.resolve(&token).await?;

    match &identity {
        Identity::Service => debug!("Authenticated service identity"),
        Identity::User(user) => debug!("Authenticated user {}", user.id),
    }

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::MalformedHeader)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(AuthError::InvalidToken("empty bearer token".to_string())),
        None => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(extract_bearer_token(&headers("Basic Zm9v")), Err(AuthError::MalformedHeader)));
        assert!(matches!(extract_bearer_token(&headers("Bearer   ")), Err(AuthError::InvalidToken(_))));
        assert!(matches!(extract_bearer_token(&HeaderMap::new()), Err(AuthError::MissingCredential)));
    }
}

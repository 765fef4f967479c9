use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub mod jwt;

pub use jwt::{generate_jwt, Claims, JwtVerifier};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredential,
    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token verification is not configured")]
    NotConfigured,
}

/// A human caller as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
}

/// Who is calling: the privileged service or a verified user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Service,
    User(UserIdentity),
}

impl Identity {
    pub fn email(&self) -> Option<&str> {
        match self {
            Identity::Service => None,
            Identity::User(user) => user.email.as_deref(),
        }
    }
}

/// Opaque bearer-token verifier
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError>;
}

/// Stands in when no signing secret is configured; every user token is refused
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledVerifier;

#[async_trait]
impl CredentialVerifier for DisabledVerifier {
    async fn verify(&self, _token: &str) -> Result<UserIdentity, AuthError> {
        Err(AuthError::NotConfigured)
    }
}

/// Turns a bearer credential into an [`Identity`]
#[derive(Clone)]
pub struct IdentityResolver {
    service_digest: Option<[u8; 32]>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl IdentityResolver {
    /// An empty service credential disables the service identity
    pub fn new(service_credential: &str, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let service_digest = (!service_credential.is_empty()).then(|| digest(service_credential));
        Self { service_digest, verifier }
    }

    pub async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        if self.service_digest == Some(digest(token)) {
            return Ok(Identity::Service);
        }
        self.verifier.verify(token).await.map(Identity::User)
    }
}

// Fixed-size digests so the comparison does not depend on the secret's length
fn digest(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

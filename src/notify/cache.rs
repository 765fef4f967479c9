use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{CacheInvalidator, NotifyError};

/// Posts tags to the site's revalidation endpoint
pub struct HttpRevalidator {
    http: reqwest::Client,
    url: url::Url,
    secret: Option<String>,
}

impl HttpRevalidator {
    pub fn new(url: &str, secret: Option<String>) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self {
            http,
            url: url::Url::parse(url)?,
            secret,
        })
    }
}

#[async_trait]
impl CacheInvalidator for HttpRevalidator {
    async fn invalidate(&self, tags: &[String]) -> Result<(), NotifyError> {
        let mut request = self.http.post(self.url.clone()).json(&json!({ "tags": tags }));
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, message });
        }
        Ok(())
    }
}

/// Used when no revalidation endpoint is configured
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, tags: &[String]) -> Result<(), NotifyError> {
        debug!("No revalidation endpoint configured; skipping {:?}", tags);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(HttpRevalidator::new("not a url", None), Err(NotifyError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn noop_always_succeeds() {
        assert!(NoopInvalidator.invalidate(&["org-1".to_string()]).await.is_ok());
    }
}

//! Best-effort side effects of a save or delete: cache invalidation and activity logging

pub mod activity;
pub mod cache;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::database::StoreError;

pub use activity::StoreActivityLog;
pub use cache::{HttpRevalidator, NoopInvalidator};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Revalidation endpoint answered {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid revalidation URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sink for page-cache invalidation tags
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, tags: &[String]) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub organization_id: String,
    pub action: String,
    pub details: String,
    pub user_email: Option<String>,
}

/// Sink for the organization activity log
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> Result<(), NotifyError>;
}

/// Cache tags touched by a change to one organization
pub fn organization_tags(organization_id: &str) -> Vec<String> {
    vec![format!("org-{}", organization_id), "organizations".to_string()]
}

/// Fires side effects on a detached task; failures are logged and never reach the caller
#[derive(Clone)]
pub struct Notifier {
    cache: Arc<dyn CacheInvalidator>,
    activity: Option<Arc<dyn ActivitySink>>,
}

impl Notifier {
    pub fn new(cache: Arc<dyn CacheInvalidator>, activity: Option<Arc<dyn ActivitySink>>) -> Self {
        Self { cache, activity }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopInvalidator), None)
    }

    pub fn organization_changed(&self, entry: ActivityEntry) -> JoinHandle<()> {
        let cache = self.cache.clone();
        let activity = self.activity.clone();

        tokio::spawn(async move {
            let tags = organization_tags(&entry.organization_id);
            match cache.invalidate(&tags).await {
                Ok(()) => debug!("Invalidated cache tags {:?}", tags),
                Err(e) => warn!("Cache invalidation for {:?} failed: {}", tags, e),
            }

            if let Some(activity) = activity {
                let action = entry.action.clone();
                if let Err(e) = activity.record(entry).await {
                    warn!("Activity log entry '{}' failed: {}", action, e);
                }
            }
        })
    }
}

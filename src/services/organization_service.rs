use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::access;
use crate::auth::Identity;
use crate::database::models::tables;
use crate::database::TableStore;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::notify::{ActivityEntry, Notifier};
use crate::sync::{SiteRows, SyncReport, Synchronizer, WriteRequest};
use crate::types::Operation;

#[derive(Debug, Clone, Serialize)]
pub struct DeletedOrganization {
    pub id: String,
    pub name: Option<String>,
}

/// Read, Write and Delete of one organization's document, gated by the permission model
#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn TableStore>,
    synchronizer: Synchronizer,
    notifier: Notifier,
    consent_page_size: i32,
}

impl OrganizationService {
    pub fn new(
        store: Arc<dyn TableStore>,
        synchronizer: Synchronizer,
        notifier: Notifier,
        consent_page_size: i32,
    ) -> Self {
        Self {
            store,
            synchronizer,
            notifier,
            consent_page_size,
        }
    }

    pub async fn read(&self, identity: &Identity, organization_id: &str) -> Result<Value, ApiError> {
        access::authorize(self.store.as_ref(), identity, organization_id, Operation::Read).await?;
        debug!("Read permitted on {}", organization_id);
        self.document(organization_id).await
    }

    pub async fn write(
        &self,
        identity: &Identity,
        organization_id: &str,
        body: Value,
    ) -> Result<(Value, SyncReport), ApiError> {
        access::authorize(self.store.as_ref(), identity, organization_id, Operation::Write).await?;
        debug!("Write permitted on {}", organization_id);

        let request = WriteRequest::parse(body)?;
        let outcome = self.synchronizer.apply(organization_id, request).await;

        // Parts applied before a failure stay persisted, so caches go stale either way
        let details = match &outcome {
            Ok(report) => report.collections.iter().map(|c| c.collection).collect::<Vec<_>>().join(", "),
            Err(failure) => format!("partial save, failed at {}", failure.collection),
        };
        self.notifier.organization_changed(ActivityEntry {
            organization_id: organization_id.to_string(),
            action: "organization_updated".to_string(),
            details,
            user_email: identity.email().map(str::to_string),
        });

        let report = outcome?;
        let document = self.document(organization_id).await?;
        Ok((document, report))
    }

    pub async fn delete(&self, identity: &Identity, organization_id: &str) -> Result<DeletedOrganization, ApiError> {
        let target = access::authorize(self.store.as_ref(), identity, organization_id, Operation::Delete).await?;
        debug!("Delete permitted on {}", organization_id);

        let removed = self
            .store
            .delete(tables::ORGANIZATIONS, FilterData::by("id", organization_id))
            .await
            .map_err(|e| match e {
                e if e.is_referential_integrity() => {
                    info!("Organization {} is still referenced: {}", organization_id, e);
                    ApiError::conflict("Organization still has dependent data and cannot be deleted")
                }
                e => e.into(),
            })?;
        if removed == 0 {
            return Err(ApiError::not_found("Organization not found"));
        }

        info!("Deleted organization {} ({:?})", target.id, target.name);
        self.notifier.organization_changed(ActivityEntry {
            organization_id: target.id.clone(),
            action: "organization_deleted".to_string(),
            details: format!("Deleted organization {}", target.name.as_deref().unwrap_or(&target.id)),
            user_email: identity.email().map(str::to_string),
        });

        Ok(DeletedOrganization {
            id: target.id,
            name: target.name,
        })
    }

    async fn document(&self, organization_id: &str) -> Result<Value, ApiError> {
        SiteRows::load(self.store.as_ref(), organization_id, self.consent_page_size)
            .await?
            .map(SiteRows::into_document)
            .ok_or_else(|| ApiError::not_found("Organization not found"))
    }
}

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, warn};

use super::permission::{evaluate, needs_creator_emails, AccessError};
use crate::auth::{Identity, UserIdentity};
use crate::database::models::{tables, OrgType, Organization, Profile};
use crate::database::TableStore;
use crate::filter::FilterData;
use crate::types::Operation;

/// The caller's profile together with their home organization
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub profile: Profile,
    pub own_org_type: OrgType,
    pub own_org_id: String,
}

/// Load the caller's profile and home organization
pub async fn load_caller(store: &dyn TableStore, user: &UserIdentity) -> Result<CallerContext, AccessError> {
    let profile = store
        .select_one(tables::PROFILES, FilterData::by("id", user.id.as_str()))
        .await?
        .as_ref()
        .and_then(Profile::from_row)
        .ok_or(AccessError::ProfileNotFound)?;

    let own_org_id = profile.organization_id.clone().ok_or(AccessError::NoOrganization)?;

    let own_org = load_organization(store, &own_org_id)
        .await?
        .ok_or(AccessError::OwnOrganizationMissing)?;

    Ok(CallerContext {
        profile,
        own_org_type: own_org.org_type,
        own_org_id,
    })
}

pub async fn load_organization(store: &dyn TableStore, id: &str) -> Result<Option<Organization>, AccessError> {
    Ok(store
        .select_one(tables::ORGANIZATIONS, FilterData::by("id", id))
        .await?
        .as_ref()
        .and_then(Organization::from_row))
}

/// Emails of admin or site-creator profiles in an organization
pub async fn creator_emails(store: &dyn TableStore, org_id: &str) -> Result<HashSet<String>, AccessError> {
    let filter = FilterData::by("organization_id", org_id).and(
        "$or",
        json!([{ "role": "admin" }, { "is_site_creator": true }]),
    );
    let rows = store.select(tables::PROFILES, filter).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("email").and_then(|v| v.as_str()).map(str::to_string))
        .collect())
}

/// Gate an operation on `target_id`, returning the target organization when allowed
pub async fn authorize(
    store: &dyn TableStore,
    identity: &Identity,
    target_id: &str,
    op: Operation,
) -> Result<Organization, AccessError> {
    let user = match identity {
        Identity::Service => {
            debug!("Service identity: {} on {}", op.as_str(), target_id);
            return load_organization(store, target_id)
                .await?
                .ok_or_else(|| AccessError::TargetNotFound(target_id.to_string()));
        }
        Identity::User(user) => user,
    };

    let caller = load_caller(store, user).await?;
    debug!(
        "Caller context loaded: user={} org={} type={:?} role={:?}",
        user.id, caller.own_org_id, caller.own_org_type, caller.profile.role
    );

    let target = load_organization(store, target_id)
        .await?
        .ok_or_else(|| AccessError::TargetNotFound(target_id.to_string()))?;

    let emails = if needs_creator_emails(&caller, &target) {
        creator_emails(store, &caller.own_org_id).await?
    } else {
        HashSet::new()
    };

    evaluate(&caller, &target, &emails, op).map_err(|denial| {
        warn!(
            "Denied {} on organization {} for user {}: {:?}",
            op.as_str(),
            target_id,
            user.id,
            denial
        );
        AccessError::Denied(denial)
    })?;

    Ok(target)
}

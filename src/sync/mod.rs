pub mod assemble;
pub mod collections;
pub mod key;
pub mod loose;
pub mod menu;
pub mod reconcile;
pub mod singleton;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::KeyPolicy;
use crate::database::models::tables;
use crate::database::{StoreError, TableStore};
use collections::{Banner, BlogPost, Collection, CookieService, Faq, Feature, MenuItem, Product, SubMenuItem};
use menu::IdentityMatcher;
use reconcile::{CollectionReport, Reconciler};

pub use assemble::SiteRows;
pub use menu::OrderThenName;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{collection}: {source}")]
    Store {
        collection: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("Organization not found: {0}")]
    OrganizationMissing(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// A Write body split into the parts the synchronizer acts on.
///
/// A missing key leaves that part untouched; an empty array clears a collection.
#[derive(Debug, Default)]
pub struct WriteRequest {
    pub organization: Option<Map<String, Value>>,
    pub settings: Option<Map<String, Value>>,
    pub hero: Option<Map<String, Value>>,
    pub collections: Map<String, Value>,
}

impl WriteRequest {
    pub fn parse(body: Value) -> Result<Self, SyncError> {
        let Value::Object(mut body) = body else {
            return Err(SyncError::InvalidPayload("body must be a JSON object".to_string()));
        };

        let organization = take_object(&mut body, &["organization"])?;
        let settings = take_object(&mut body, &["settings", "settingsData"])?;
        let hero = take_object(&mut body, &["hero", "heroData", "website_hero"])?;

        let mut collections = Map::new();
        for name in collections::COLLECTION_KEYS {
            match body.remove(name) {
                None | Some(Value::Null) => {}
                Some(items @ Value::Array(_)) => {
                    collections.insert(name.to_string(), items);
                }
                Some(_) => return Err(SyncError::InvalidPayload(format!("{} must be an array", name))),
            }
        }

        Ok(Self { organization, settings, hero, collections })
    }

    fn items(&self, name: &str) -> Option<Vec<Value>> {
        self.collections.get(name).and_then(Value::as_array).cloned()
    }
}

/// First present key wins; null counts as absent
fn take_object(body: &mut Map<String, Value>, keys: &[&str]) -> Result<Option<Map<String, Value>>, SyncError> {
    let mut found = None;
    for key in keys {
        match body.remove(*key) {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                if found.is_none() {
                    found = Some(map);
                }
            }
            Some(_) => return Err(SyncError::InvalidPayload(format!("{} must be an object", key))),
        }
    }
    Ok(found)
}

/// What a successful save did, per collection in processing order
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub collections: Vec<CollectionReport>,
}

/// A save that stopped part-way; earlier parts stay applied
#[derive(Debug, Error)]
#[error("sync failed at {collection}: {source}")]
pub struct SyncFailure {
    pub collection: &'static str,
    pub completed: Vec<&'static str>,
    #[source]
    pub source: SyncError,
}

/// Applies a [`WriteRequest`] to one organization, one part at a time.
///
/// Parts run in a fixed order and are not wrapped in a transaction: the first failing part
/// stops the save and is reported with the parts already applied.
#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn TableStore>,
    menu_policy: KeyPolicy,
    matcher: Arc<dyn IdentityMatcher>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn TableStore>, menu_policy: KeyPolicy, matcher: Arc<dyn IdentityMatcher>) -> Self {
        Self { store, menu_policy, matcher }
    }

    pub async fn apply(&self, organization_id: &str, request: WriteRequest) -> Result<SyncReport, SyncFailure> {
        let mut progress = Progress::default();
        let store = self.store.as_ref();
        let reconciler = Reconciler::new(store, organization_id);

        if let Some(fields) = &request.organization {
            let result = singleton::update_organization(store, organization_id, fields).await;
            progress.record("organization", result)?;
        }
        if let Some(fields) = &request.settings {
            let changes = singleton::settings_changes(fields);
            let result = singleton::upsert_single(store, "settings", tables::SETTINGS, organization_id, changes).await;
            progress.record("settings", result)?;
        }
        if let Some(fields) = &request.hero {
            let changes = singleton::hero_changes(fields);
            let result = singleton::upsert_single(store, "hero", tables::HERO, organization_id, changes).await;
            progress.record("hero", result)?;
        }

        // Menu first: submenu references are rewritten against its outcome
        let mut menu_orphans = Vec::new();
        let mut successors = None;
        if let Some(items) = request.items(MenuItem::NAME) {
            let result = reconciler.reconcile::<MenuItem>(&items, self.menu_policy).await;
            let menu = progress.step(MenuItem::NAME, result)?;
            successors = Some(menu::successor_keys(&menu.previous, &menu.written, self.matcher.as_ref()));
            menu_orphans = menu.orphaned;
            progress.push(menu.report);
        }

        if let Some(mut items) = request.items(SubMenuItem::NAME) {
            if let Some(successors) = &successors {
                let rewritten = menu::rewrite_submenu_refs(&mut items, successors);
                debug!("Rewrote {} submenu references", rewritten);
            }
            let menu_keys = progress.step(SubMenuItem::NAME, reconciler.keys::<MenuItem>().await)?;
            let detached = menu::detach_unknown_parents(&mut items, &menu_keys);
            if detached > 0 {
                info!("Dropping {} submenu items without a menu item in {}", detached, organization_id);
            }
            let result = reconciler.reconcile::<SubMenuItem>(&items, KeyPolicy::Stable).await;
            let submenu = progress.step(SubMenuItem::NAME, result)?;
            progress.push(submenu.report);
        }

        // Menu rows that were only held by submenu items removed above
        if !menu_orphans.is_empty() {
            let result = reconciler.retry_deletes::<MenuItem>(&menu_orphans).await;
            let removed = progress.step(MenuItem::NAME, result)?;
            progress.settle_retained(MenuItem::NAME, removed);
        }

        self.reconcile_plain::<BlogPost>(&reconciler, &request, &mut progress).await?;
        self.reconcile_plain::<Product>(&reconciler, &request, &mut progress).await?;
        self.reconcile_plain::<Feature>(&reconciler, &request, &mut progress).await?;
        self.reconcile_plain::<Faq>(&reconciler, &request, &mut progress).await?;
        self.reconcile_plain::<Banner>(&reconciler, &request, &mut progress).await?;
        self.reconcile_plain::<CookieService>(&reconciler, &request, &mut progress).await?;

        info!(
            "Synchronized organization {}: {}",
            organization_id,
            progress.completed().join(", ")
        );
        Ok(progress.report)
    }

    async fn reconcile_plain<C: Collection>(
        &self,
        reconciler: &Reconciler<'_>,
        request: &WriteRequest,
        progress: &mut Progress,
    ) -> Result<(), SyncFailure> {
        if let Some(items) = request.items(C::NAME) {
            let result = reconciler.reconcile::<C>(&items, KeyPolicy::Stable).await;
            let reconciled = progress.step(C::NAME, result)?;
            progress.push(reconciled.report);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Progress {
    report: SyncReport,
}

impl Progress {
    fn completed(&self) -> Vec<&'static str> {
        self.report.collections.iter().map(|c| c.collection).collect()
    }

    fn step<T>(&self, collection: &'static str, result: Result<T, SyncError>) -> Result<T, SyncFailure> {
        result.map_err(|source| {
            error!("Sync of {} failed: {}", collection, source);
            SyncFailure {
                collection,
                completed: self.completed(),
                source,
            }
        })
    }

    fn record(&mut self, collection: &'static str, result: Result<CollectionReport, SyncError>) -> Result<(), SyncFailure> {
        let report = self.step(collection, result)?;
        self.push(report);
        Ok(())
    }

    fn push(&mut self, report: CollectionReport) {
        self.report.collections.push(report);
    }

    fn settle_retained(&mut self, collection: &'static str, removed: usize) {
        if let Some(report) = self.report.collections.iter_mut().find(|c| c.collection == collection) {
            report.retained -= removed.min(report.retained);
            report.deleted += removed;
        }
    }
}

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::collections::Collection;
use super::key::RowKey;
use super::SyncError;
use crate::config::KeyPolicy;
use crate::database::{Row, StoreError, TableStore};
use crate::filter::FilterData;

/// Per-collection outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: &'static str,
    pub updated: usize,
    pub inserted: usize,
    pub deleted: usize,
    /// Deletes refused by a foreign key; those rows survive
    pub retained: usize,
    /// Items that failed validation
    pub dropped: usize,
}

impl CollectionReport {
    pub fn new(collection: &'static str) -> Self {
        Self { collection, ..Default::default() }
    }
}

#[derive(Debug)]
pub struct Reconciled {
    /// Rows persisted before this pass
    pub previous: Vec<Row>,
    /// Rows written by this pass: updates first, then inserts
    pub written: Vec<Row>,
    /// Rows that should have been deleted but were held by a foreign key
    pub orphaned: Vec<RowKey>,
    pub report: CollectionReport,
}

/// Diffs a client snapshot of one collection against the persisted rows of one organization
pub struct Reconciler<'a> {
    store: &'a dyn TableStore,
    organization_id: &'a str,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn TableStore, organization_id: &'a str) -> Self {
        Self { store, organization_id }
    }

    fn scoped(&self) -> FilterData {
        FilterData::by("organization_id", self.organization_id)
    }

    fn store_error<C: Collection>(source: StoreError) -> SyncError {
        SyncError::Store { collection: C::NAME, source }
    }

    pub async fn reconcile<C: Collection>(&self, incoming: &[Value], policy: KeyPolicy) -> Result<Reconciled, SyncError> {
        let mut report = CollectionReport::new(C::NAME);

        let previous = self
            .store
            .select(C::TABLE, self.scoped().order_by(C::ORDER))
            .await
            .map_err(Self::store_error::<C>)?;
        let existing: Vec<RowKey> = previous.iter().filter_map(|row| RowKey::of_row(row, C::KEY)).collect();

        let incoming_keys: HashSet<RowKey> = incoming
            .iter()
            .filter_map(|item| item.get("id"))
            .filter_map(|id| RowKey::parse(id, C::KEY))
            .collect();

        let to_delete: Vec<RowKey> = match policy {
            KeyPolicy::Stable => existing.iter().copied().filter(|k| !incoming_keys.contains(k)).collect(),
            KeyPolicy::Reissue => existing.clone(),
        };

        let mut removed = HashSet::new();
        let mut orphaned = Vec::new();
        for key in to_delete {
            match self.delete_one(C::TABLE, key).await {
                Ok(_) => {
                    removed.insert(key);
                    report.deleted += 1;
                }
                Err(e) if e.is_referential_integrity() => {
                    info!("Keeping {} row {}: still referenced ({})", C::NAME, key, e);
                    report.retained += 1;
                    if !incoming_keys.contains(&key) {
                        orphaned.push(key);
                    }
                }
                Err(e) => return Err(Self::store_error::<C>(e)),
            }
        }

        let surviving: HashSet<RowKey> = existing.into_iter().filter(|k| !removed.contains(k)).collect();

        let mut updates = Vec::new();
        let mut inserts = Vec::new();
        for item in incoming {
            let Ok(parsed) = serde_json::from_value::<C>(item.clone()) else {
                report.dropped += 1;
                continue;
            };
            if !parsed.is_valid() {
                report.dropped += 1;
                continue;
            }

            let mut row = parsed.to_row();
            row.insert("organization_id".to_string(), Value::String(self.organization_id.to_string()));

            // Ids that are malformed or belong to no surviving row of this organization become inserts
            match item.get("id").and_then(|id| RowKey::parse(id, C::KEY)) {
                Some(key) if surviving.contains(&key) => {
                    row.insert("id".to_string(), key.to_value());
                    updates.push(row);
                }
                _ => inserts.push(row),
            }
        }

        let mut written = Vec::with_capacity(updates.len() + inserts.len());
        if !updates.is_empty() {
            let upserted = self.store.upsert(C::TABLE, updates).await.map_err(Self::store_error::<C>)?;
            report.updated = upserted.len();
            written.extend(upserted);
        }
        if !inserts.is_empty() {
            let inserted = self.store.insert(C::TABLE, inserts).await.map_err(Self::store_error::<C>)?;
            report.inserted = inserted.len();
            written.extend(inserted);
        }

        debug!(
            "Reconciled {}: {} updated, {} inserted, {} deleted, {} retained, {} dropped",
            C::NAME,
            report.updated,
            report.inserted,
            report.deleted,
            report.retained,
            report.dropped
        );

        Ok(Reconciled { previous, written, orphaned, report })
    }

    /// Keys of this organization's persisted rows in `C`
    pub async fn keys<C: Collection>(&self) -> Result<HashSet<RowKey>, SyncError> {
        let rows = self
            .store
            .select(C::TABLE, self.scoped())
            .await
            .map_err(Self::store_error::<C>)?;
        Ok(rows.iter().filter_map(|row| RowKey::of_row(row, C::KEY)).collect())
    }

    /// Retry deletes that a foreign key refused earlier in the same save.
    ///
    /// Returns how many rows were removed; rows still referenced stay put.
    pub async fn retry_deletes<C: Collection>(&self, keys: &[RowKey]) -> Result<usize, SyncError> {
        let mut removed = 0;
        for key in keys {
            match self.delete_one(C::TABLE, *key).await {
                Ok(n) => removed += n as usize,
                Err(e) if e.is_referential_integrity() => {
                    info!("{} row {} is still referenced, keeping it", C::NAME, key);
                }
                Err(e) => return Err(Self::store_error::<C>(e)),
            }
        }
        Ok(removed)
    }

    async fn delete_one(&self, table: &str, key: RowKey) -> Result<u64, StoreError> {
        self.store.delete(table, self.scoped().and("id", key.to_value())).await
    }
}

//! Single-row writes: the organization itself, its settings and its hero section

use serde_json::{Map, Value};

use super::collections::COLLECTION_KEYS;
use super::reconcile::CollectionReport;
use super::SyncError;
use crate::database::models::tables;
use crate::database::{Row, TableStore};
use crate::filter::FilterData;

/// Organization columns a save may never change
const ORGANIZATION_LOCKED: [&str; 3] = ["id", "type", "created_by_email"];

/// Keys that never belong in the settings row
const SETTINGS_EXCLUDED: [&str; 8] = [
    "id",
    "organization_id",
    "organization",
    "settings",
    "settingsData",
    "hero",
    "heroData",
    "website_hero",
];

/// UI names of hero fields and the columns they land in
const HERO_RENAMES: [(&str, &str); 3] = [
    ("hero_image", "image"),
    ("hero_name", "name"),
    ("hero_font_family", "font_family"),
];

pub fn organization_changes(fields: &Map<String, Value>) -> Row {
    fields
        .iter()
        .filter(|(k, _)| !ORGANIZATION_LOCKED.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub fn settings_changes(fields: &Map<String, Value>) -> Row {
    fields
        .iter()
        .filter(|(k, _)| !SETTINGS_EXCLUDED.contains(&k.as_str()) && !COLLECTION_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub fn hero_changes(fields: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    for (key, value) in fields {
        if key == "id" || key == "organization_id" {
            continue;
        }
        let column = HERO_RENAMES
            .iter()
            .find(|(ui, _)| *ui == key.as_str())
            .map(|(_, column)| column.to_string())
            .unwrap_or_else(|| key.clone());
        // An explicit column wins over its prefixed alias
        if column != *key && fields.contains_key(&column) {
            continue;
        }
        row.insert(column, value.clone());
    }
    row
}

pub async fn update_organization(
    store: &dyn TableStore,
    organization_id: &str,
    fields: &Map<String, Value>,
) -> Result<CollectionReport, SyncError> {
    let mut report = CollectionReport::new("organization");
    let changes = organization_changes(fields);
    if changes.is_empty() {
        return Ok(report);
    }

    let key = Value::String(organization_id.to_string());
    store
        .update(tables::ORGANIZATIONS, &key, changes)
        .await
        .map_err(|source| SyncError::Store { collection: "organization", source })?
        .ok_or_else(|| SyncError::OrganizationMissing(organization_id.to_string()))?;
    report.updated = 1;
    Ok(report)
}

/// Update the organization's single row in `table`, or create it
pub async fn upsert_single(
    store: &dyn TableStore,
    collection: &'static str,
    table: &str,
    organization_id: &str,
    changes: Row,
) -> Result<CollectionReport, SyncError> {
    let mut report = CollectionReport::new(collection);
    if changes.is_empty() {
        return Ok(report);
    }
    let store_error = |source| SyncError::Store { collection, source };

    let existing = store
        .select_one(table, FilterData::by("organization_id", organization_id).order_by("id asc"))
        .await
        .map_err(store_error)?;

    match existing.as_ref().and_then(|row| row.get("id")) {
        Some(key) => {
            store.update(table, key, changes).await.map_err(store_error)?;
            report.updated = 1;
        }
        None => {
            let mut row = changes;
            row.insert("organization_id".to_string(), Value::String(organization_id.to_string()));
            store.insert(table, vec![row]).await.map_err(store_error)?;
            report.inserted = 1;
        }
    }
    Ok(report)
}

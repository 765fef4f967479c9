use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::tables;
use crate::database::store::{Row, StoreError, TableStore};
use crate::filter::FilterData;

/// How a table assigns primary keys to inserted rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Serial,
    Uuid,
}

/// `table.column` references `references.id`
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub references: String,
}

impl ForeignKey {
    pub fn new(table: &str, column: &str, references: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            references: references.to_string(),
        }
    }
}

/// Store operation, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
    Upsert,
    Delete,
}

#[derive(Debug)]
struct TableData {
    key: KeyKind,
    rows: Vec<Row>,
    next_id: i64,
}

impl TableData {
    fn new(key: KeyKind) -> Self {
        Self { key, rows: Vec::new(), next_id: 1 }
    }

    fn position(&self, key: &Value) -> Option<usize> {
        let by_key = FilterData::by("id", key.clone());
        self.rows.iter().position(|row| by_key.matches(row).unwrap_or(false))
    }

    fn push(&mut self, mut row: Row) -> Row {
        match row.get("id") {
            Some(Value::Number(n)) => {
                if let Some(id) = n.as_i64() {
                    self.next_id = self.next_id.max(id + 1);
                }
            }
            Some(Value::String(_)) => {}
            _ => {
                let id = match self.key {
                    KeyKind::Serial => {
                        let id = self.next_id;
                        self.next_id += 1;
                        Value::from(id)
                    }
                    KeyKind::Uuid => Value::String(Uuid::new_v4().to_string()),
                };
                row.insert("id".to_string(), id);
            }
        }
        self.rows.push(row.clone());
        row
    }
}

/// In-process [`TableStore`] that enforces declared foreign keys on every write.
///
/// Serves the test suite and `--store memory` local runs. Keys are never reused
/// after a delete.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, TableData>>,
    foreign_keys: Vec<ForeignKey>,
    failures: RwLock<HashSet<(String, StoreOp)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preconfigured with the site schema's key kinds and foreign keys
    pub fn with_site_schema() -> Self {
        let mut store = Self::new();
        for (table, key) in tables::KEY_KINDS {
            store = store.with_table(table, *key);
        }
        for (table, column, references) in tables::FOREIGN_KEYS {
            store = store.with_foreign_key(ForeignKey::new(table, column, references));
        }
        store
    }

    pub fn with_table(mut self, table: &str, key: KeyKind) -> Self {
        self.tables.get_mut().insert(table.to_string(), TableData::new(key));
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Make every subsequent `op` on `table` fail with a backend error
    pub async fn fail_on(&self, table: &str, op: StoreOp) {
        self.failures.write().await.insert((table.to_string(), op));
    }

    pub async fn seed(&self, table: &str, rows: Vec<Value>) -> Vec<Row> {
        let mut tables = self.tables.write().await;
        let data = tables
            .entry(table.to_string())
            .or_insert_with(|| TableData::new(KeyKind::Serial));
        rows.into_iter()
            .filter_map(|v| match v {
                Value::Object(row) => Some(data.push(row)),
                _ => None,
            })
            .collect()
    }

    /// Snapshot of a table's rows in insertion order
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|data| data.rows.clone())
            .unwrap_or_default()
    }

    async fn check_failure(&self, table: &str, op: StoreOp) -> Result<(), StoreError> {
        if self.failures.read().await.contains(&(table.to_string(), op)) {
            return Err(StoreError::Backend(format!("injected {:?} failure on {}", op, table)));
        }
        Ok(())
    }

    fn referencing_row(&self, tables: &HashMap<String, TableData>, table: &str, key: &Value) -> Option<String> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.references == table)
            .find(|fk| {
                let by_ref = FilterData::by(&fk.column, key.clone());
                tables
                    .get(&fk.table)
                    .map(|data| data.rows.iter().any(|row| by_ref.matches(row).unwrap_or(false)))
                    .unwrap_or(false)
            })
            .map(|fk| format!("{}.{} still references {}", fk.table, fk.column, key))
    }

    /// First declared reference in `row` that points at no existing row
    fn dangling_reference(&self, tables: &HashMap<String, TableData>, table: &str, row: &Row) -> Option<String> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.table == table)
            .find_map(|fk| {
                let value = row.get(&fk.column).filter(|v| !v.is_null())?;
                let found = tables
                    .get(&fk.references)
                    .map(|data| data.position(value).is_some())
                    .unwrap_or(false);
                (!found).then(|| format!("{}.{} = {} has no row in {}", fk.table, fk.column, value, fk.references))
            })
    }

    fn check_references<'r>(
        &self,
        tables: &HashMap<String, TableData>,
        table: &str,
        rows: impl IntoIterator<Item = &'r Row>,
    ) -> Result<(), StoreError> {
        for row in rows {
            if let Some(message) = self.dangling_reference(tables, table, row) {
                return Err(StoreError::ReferentialIntegrity { table: table.to_string(), message });
            }
        }
        Ok(())
    }
}

fn merge(target: &mut Row, changes: Row) {
    for (column, value) in changes {
        target.insert(column, value);
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn select(&self, table: &str, filter: FilterData) -> Result<Vec<Row>, StoreError> {
        self.check_failure(table, StoreOp::Select).await?;
        let rows = self.rows(table).await;
        Ok(filter.apply(rows)?)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        self.check_failure(table, StoreOp::Insert).await?;
        let mut tables = self.tables.write().await;
        self.check_references(&tables, table, &rows)?;
        let data = tables
            .entry(table.to_string())
            .or_insert_with(|| TableData::new(KeyKind::Serial));
        Ok(rows.into_iter().map(|row| data.push(row)).collect())
    }

    async fn update(&self, table: &str, key: &Value, changes: Row) -> Result<Option<Row>, StoreError> {
        self.check_failure(table, StoreOp::Update).await?;
        let mut tables = self.tables.write().await;
        self.check_references(&tables, table, [&changes])?;
        let Some(data) = tables.get_mut(table) else {
            return Ok(None);
        };
        Ok(data.position(key).map(|index| {
            let row = &mut data.rows[index];
            merge(row, changes);
            row.clone()
        }))
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        self.check_failure(table, StoreOp::Upsert).await?;
        let mut tables = self.tables.write().await;
        self.check_references(&tables, table, &rows)?;
        let data = tables
            .entry(table.to_string())
            .or_insert_with(|| TableData::new(KeyKind::Serial));

        let mut written = Vec::with_capacity(rows.len());
        for row in rows {
            let existing = row.get("id").and_then(|key| data.position(key));
            match existing {
                Some(index) => {
                    let target = &mut data.rows[index];
                    merge(target, row);
                    written.push(target.clone());
                }
                None => written.push(data.push(row)),
            }
        }
        Ok(written)
    }

    async fn delete(&self, table: &str, filter: FilterData) -> Result<u64, StoreError> {
        self.check_failure(table, StoreOp::Delete).await?;
        if filter.where_clause.is_none() {
            return Err(StoreError::Backend("DELETE requires a WHERE clause".to_string()));
        }

        let mut tables = self.tables.write().await;
        let Some(data) = tables.get(table) else {
            return Ok(0);
        };

        let mut doomed = Vec::new();
        for (index, row) in data.rows.iter().enumerate() {
            if filter.matches(row)? {
                doomed.push(index);
            }
        }

        // All-or-nothing, like a single DELETE statement
        for index in &doomed {
            if let Some(key) = data.rows[*index].get("id") {
                if let Some(message) = self.referencing_row(&tables, table, key) {
                    return Err(StoreError::ReferentialIntegrity { table: table.to_string(), message });
                }
            }
        }

        if let Some(data) = tables.get_mut(table) {
            for index in doomed.iter().rev() {
                data.rows.remove(*index);
            }
        }
        Ok(doomed.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn assigns_serial_keys_without_reuse() {
        let store = MemoryStore::new();
        let first = store.insert("faq", vec![row(json!({ "question": "a" }))]).await.unwrap();
        assert_eq!(first[0]["id"], json!(1));

        store.delete("faq", FilterData::by("id", 1)).await.unwrap();
        let second = store.insert("faq", vec![row(json!({ "question": "b" }))]).await.unwrap();
        assert_eq!(second[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn assigns_uuid_keys() {
        let store = MemoryStore::new().with_table("banners", KeyKind::Uuid);
        let rows = store.insert("banners", vec![row(json!({ "position": "top" }))]).await.unwrap();
        let id = rows[0]["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn upsert_updates_existing_and_inserts_new() {
        let store = MemoryStore::new();
        store.seed("feature", vec![json!({ "id": 5, "name": "old", "slug": "keep" })]).await;

        let written = store
            .upsert("feature", vec![row(json!({ "id": 5, "name": "new" })), row(json!({ "id": 9, "name": "other" }))])
            .await
            .unwrap();
        assert_eq!(written.len(), 2);

        let rows = store.rows("feature").await;
        assert_eq!(rows[0], row(json!({ "id": 5, "name": "new", "slug": "keep" })));
        assert_eq!(rows[1]["id"], json!(9));
    }

    #[tokio::test]
    async fn delete_blocked_by_foreign_key() {
        let store = MemoryStore::new()
            .with_foreign_key(ForeignKey::new("website_submenuitem", "menu_item_id", "website_menuitem"));
        store.seed("website_menuitem", vec![json!({ "id": 1 }), json!({ "id": 2 })]).await;
        store.seed("website_submenuitem", vec![json!({ "id": 1, "menu_item_id": 1 })]).await;

        let err = store.delete("website_menuitem", FilterData::by("id", 1)).await.unwrap_err();
        assert!(err.is_referential_integrity());
        assert_eq!(store.rows("website_menuitem").await.len(), 2);

        assert_eq!(store.delete("website_menuitem", FilterData::by("id", 2)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn writes_with_dangling_references_are_refused() {
        let store = MemoryStore::new()
            .with_foreign_key(ForeignKey::new("website_submenuitem", "menu_item_id", "website_menuitem"));
        store.seed("website_menuitem", vec![json!({ "id": 1 })]).await;
        store.seed("website_submenuitem", vec![json!({ "id": 1, "menu_item_id": 1 })]).await;

        let err = store
            .insert(
                "website_submenuitem",
                vec![row(json!({ "menu_item_id": 1 })), row(json!({ "menu_item_id": 42 }))],
            )
            .await
            .unwrap_err();
        assert!(err.is_referential_integrity());
        assert_eq!(store.rows("website_submenuitem").await.len(), 1);

        let err = store
            .upsert("website_submenuitem", vec![row(json!({ "id": 1, "menu_item_id": 42 }))])
            .await
            .unwrap_err();
        assert!(err.is_referential_integrity());
        let err = store
            .update("website_submenuitem", &json!(1), row(json!({ "menu_item_id": 42 })))
            .await
            .unwrap_err();
        assert!(err.is_referential_integrity());
        assert_eq!(store.rows("website_submenuitem").await[0]["menu_item_id"], json!(1));

        // Null references are allowed
        let written = store
            .insert("website_submenuitem", vec![row(json!({ "menu_item_id": null }))])
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_backend_errors() {
        let store = MemoryStore::new();
        store.fail_on("product", StoreOp::Insert).await;
        let err = store.insert("product", vec![row(json!({ "product_name": "x" }))]).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn refuses_unfiltered_delete() {
        let store = MemoryStore::new();
        assert!(store.delete("faq", FilterData::default()).await.is_err());
    }
}

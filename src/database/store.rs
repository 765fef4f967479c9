use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::{FilterData, FilterError};

/// A persisted row as a JSON object keyed by column name
pub type Row = Map<String, Value>;

/// Errors from a [`TableStore`] backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row is still referenced by another row (delete refused)
    #[error("Referential integrity violation on {table}: {message}")]
    ReferentialIntegrity { table: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid query: {0}")]
    Query(#[from] FilterError),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Store failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_referential_integrity(&self) -> bool {
        matches!(self, StoreError::ReferentialIntegrity { .. })
    }
}

/// Table-oriented persistence used by the synchronizer.
///
/// Rows travel as JSON objects. `upsert` resolves conflicts on the `id` column;
/// rows handed to `insert` carry no `id` and receive a store-assigned key.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, table: &str, filter: FilterData) -> Result<Vec<Row>, StoreError>;

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError>;

    /// Update the row whose `id` equals `key`; `None` when no such row exists
    async fn update(&self, table: &str, key: &Value, changes: Row) -> Result<Option<Row>, StoreError>;

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError>;

    /// Delete every row matching the filter, returning the number removed
    async fn delete(&self, table: &str, filter: FilterData) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn select_one(&self, table: &str, filter: FilterData) -> Result<Option<Row>, StoreError> {
        Ok(self.select(table, filter.limit(1)).await?.into_iter().next())
    }
}

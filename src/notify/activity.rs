use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{ActivityEntry, ActivitySink, NotifyError};
use crate::database::models::tables;
use crate::database::{Row, TableStore};

/// Writes activity entries into the `activity_logs` table
pub struct StoreActivityLog {
    store: Arc<dyn TableStore>,
}

impl StoreActivityLog {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActivitySink for StoreActivityLog {
    async fn record(&self, entry: ActivityEntry) -> Result<(), NotifyError> {
        let mut row = Row::new();
        row.insert("organization_id".to_string(), Value::String(entry.organization_id));
        row.insert("action".to_string(), Value::String(entry.action));
        row.insert("details".to_string(), Value::String(entry.details));
        row.insert(
            "user_email".to_string(),
            entry.user_email.map(Value::String).unwrap_or(Value::Null),
        );
        row.insert("created_at".to_string(), Value::String(Utc::now().to_rfc3339()));

        self.store.insert(tables::ACTIVITY_LOGS, vec![row]).await?;
        Ok(())
    }
}

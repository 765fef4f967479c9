use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Row as _};

use crate::database::store::{Row, StoreError, TableStore};
use crate::filter::{Filter, FilterData, FilterError};

/// SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// [`TableStore`] over Postgres with dynamic JSON rows.
///
/// Reads go through `row_to_json`; writes go through `json_populate_record` so the
/// table's own column types drive the conversion from JSON.
#[derive(Clone)]
pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_rows(
        &self,
        table: &str,
        query: sqlx::query::Query<'_, sqlx::Postgres, PgArguments>,
    ) -> Result<Vec<Row>, StoreError> {
        let rows = query.fetch_all(&self.pool).await.map_err(|e| classify(table, e))?;
        rows.iter()
            .map(|row| {
                let value: Value = row.try_get("row")?;
                match value {
                    Value::Object(map) => Ok(map),
                    other => Err(StoreError::Backend(format!("expected JSON object row, got {}", other))),
                }
            })
            .collect()
    }

    async fn write_one(&self, table: &str, row: Row, upsert: bool) -> Result<Option<Row>, StoreError> {
        let columns = quoted_columns(&row)?;
        let sql = if columns.is_empty() {
            format!("INSERT INTO \"{table}\" AS t DEFAULT VALUES RETURNING row_to_json(t) AS row")
        } else {
            let list = columns.join(", ");
            let mut sql = format!(
                "INSERT INTO \"{table}\" AS t ({list}) SELECT {list} FROM json_populate_record(NULL::\"{table}\", $1::json)"
            );
            if upsert {
                let assignments: Vec<String> = columns
                    .iter()
                    .filter(|c| c.as_str() != "\"id\"")
                    .map(|c| format!("{c} = EXCLUDED.{c}"))
                    .collect();
                let assignments = if assignments.is_empty() {
                    "\"id\" = EXCLUDED.\"id\"".to_string()
                } else {
                    assignments.join(", ")
                };
                sql.push_str(&format!(" ON CONFLICT (\"id\") DO UPDATE SET {assignments}"));
            }
            sql.push_str(" RETURNING row_to_json(t) AS row");
            sql
        };

        let query = sqlx::query(&sql).bind(Value::Object(row));
        Ok(self.fetch_rows(table, query).await?.into_iter().next())
    }
}

#[async_trait]
impl TableStore for PgTableStore {
    async fn select(&self, table: &str, filter: FilterData) -> Result<Vec<Row>, StoreError> {
        let mut compiled = Filter::new(table)?;
        compiled.assign(filter)?;
        let sql_result = compiled.to_sql()?;

        let mut query = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            query = bind_param(query, p);
        }
        self.fetch_rows(table, query).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        Filter::validate_table_name(table)?;
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            inserted.extend(self.write_one(table, row, false).await?);
        }
        Ok(inserted)
    }

    async fn update(&self, table: &str, key: &Value, changes: Row) -> Result<Option<Row>, StoreError> {
        Filter::validate_table_name(table)?;
        let key_text = key_as_text(key)?;
        let columns = quoted_columns(&changes)?;

        if columns.is_empty() {
            return self.select_one(table, FilterData::by("id", key_text)).await;
        }

        let list = columns.join(", ");
        let sql = format!(
            "UPDATE \"{table}\" AS t SET ({list}) = (SELECT {list} FROM json_populate_record(NULL::\"{table}\", $1::json)) \
             WHERE t.\"id\"::text = $2 RETURNING row_to_json(t) AS row"
        );
        let query = sqlx::query(&sql).bind(Value::Object(changes)).bind(key_text);
        Ok(self.fetch_rows(table, query).await?.into_iter().next())
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        Filter::validate_table_name(table)?;
        let mut written = Vec::with_capacity(rows.len());
        for row in rows {
            written.extend(self.write_one(table, row, true).await?);
        }
        Ok(written)
    }

    async fn delete(&self, table: &str, filter: FilterData) -> Result<u64, StoreError> {
        let mut compiled = Filter::new(table)?;
        compiled.assign(filter)?;
        let sql_result = compiled.to_delete_sql()?;

        let mut query = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            query = bind_param(query, p);
        }
        let result = query.execute(&self.pool).await.map_err(|e| classify(table, e))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn classify(table: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return StoreError::ReferentialIntegrity {
                table: table.to_string(),
                message: db_err.message().to_string(),
            };
        }
    }
    StoreError::Sqlx(err)
}

fn quoted_columns(row: &Row) -> Result<Vec<String>, StoreError> {
    row.keys()
        .map(|column| {
            let valid = !column.is_empty() && column.chars().all(|c| c.is_alphanumeric() || c == '_');
            if valid {
                Ok(format!("\"{}\"", column))
            } else {
                Err(StoreError::Query(FilterError::InvalidColumn(column.clone())))
            }
        })
        .collect()
}

fn key_as_text(key: &Value) -> Result<String, StoreError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(StoreError::Backend(format!("unsupported key value: {}", other))),
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

//! SQLite-backed document store.
//!
//! Documents live in a single table keyed by `(collection, id)` with the
//! JSON payload in `data`. Merge writes are a single upsert that patches the
//! stored object in place.

use super::{Document, DocumentStore, StoreError};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);
"#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url`, e.g. `sqlite://articles.db`
    /// or `sqlite::memory:`.
    #[instrument(level = "info")]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connect(format!("{url}: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // In-memory databases are per connection, so keep exactly one.
        let max_connections = if in_memory { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connect(format!("{url}: {e}")))?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;
        info!("Document store ready");

        Ok(Self { pool })
    }
}

fn decode(id: &str, raw: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(id.to_string())),
    }
}

impl DocumentStore for SqliteStore {
    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(raw,)| decode(id, &raw)).transpose()
    }

    async fn merge_set_with_defaults(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        defaults: Document,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_string(&fields)?;
        let defaults = serde_json::to_string(&defaults)?;

        // Single statement: no read-modify-write window between lanes.
        // Defaults are patched beneath the stored object, then `fields` on top.
        // Payloads carry no nulls, so json_patch replaces exactly the keys given.
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, updated_at)
            VALUES (?, ?, json_patch(?, ?), ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                data = json_patch(json_patch(?, documents.data), ?),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&defaults)
        .bind(&data)
        .bind(chrono::Utc::now().timestamp())
        .bind(&defaults)
        .bind(&data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn scan_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        // json_extract hands back SQL values, so compare against the JSON text
        // form of the needle through json_quote on both sides.
        let path = format!("$.{field}");
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM documents
            WHERE collection = ?
              AND json_quote(json_extract(data, ?)) = json(?)
              AND id > ?
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(collection)
        .bind(&path)
        .bind(serde_json::to_string(value)?)
        .bind(after.unwrap_or(""))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0usize;
        for id in ids {
            let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(removed)
    }
}

//! Document store adapters.
//!
//! The pipeline needs only a handful of primitives from its store: a point
//! existence check (the dedup index), a merge-upsert, and, for the
//! administrative purge, a paginated equality scan plus batched deletes.
//!
//! # Backends
//!
//! | Backend | Module | Notes |
//! |---------|--------|-------|
//! | SQLite | [`sqlite`] | One `documents` table, JSON payloads |
//! | In-memory | [`memory`] | Dry runs and tests; nothing survives the process |

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, instrument};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to document store: {0}")]
    Connect(String),
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("document {0} is not a JSON object")]
    NotAnObject(String),
}

/// Minimal document store interface used by the pipeline.
pub trait DocumentStore {
    /// Whether a document with this id exists in the collection.
    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create the document, or merge `fields` into the existing one.
    ///
    /// Top-level keys in `fields` replace stored values; keys not present in
    /// `fields` keep whatever was stored before.
    async fn merge_set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.merge_set_with_defaults(collection, id, fields, Document::new())
            .await
    }

    /// Like [`merge_set`](DocumentStore::merge_set), but each key in
    /// `defaults` is only written when neither `fields` nor the stored
    /// document has it.
    async fn merge_set_with_defaults(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        defaults: Document,
    ) -> Result<(), StoreError>;

    /// Ids of documents whose `field` equals `value`, ordered by id.
    ///
    /// Returns at most `limit` ids strictly greater than `after`.
    async fn scan_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Delete the given ids in one batch, returning how many existed.
    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<usize, StoreError>;
}

/// The store selected by configuration.
#[derive(Debug)]
pub enum AnyStore {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

/// Open the store named by `url`: `memory` for the in-process store,
/// anything else is handed to SQLite.
pub async fn open(url: &str) -> Result<AnyStore, StoreError> {
    if url == "memory" {
        info!("Using in-memory document store; nothing will be persisted");
        return Ok(AnyStore::Memory(MemoryStore::new()));
    }
    Ok(AnyStore::Sqlite(SqliteStore::connect(url).await?))
}

impl DocumentStore for AnyStore {
    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        match self {
            AnyStore::Sqlite(store) => store.exists(collection, id).await,
            AnyStore::Memory(store) => store.exists(collection, id).await,
        }
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        match self {
            AnyStore::Sqlite(store) => store.get(collection, id).await,
            AnyStore::Memory(store) => store.get(collection, id).await,
        }
    }

    async fn merge_set_with_defaults(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        defaults: Document,
    ) -> Result<(), StoreError> {
        match self {
            AnyStore::Sqlite(store) => {
                store
                    .merge_set_with_defaults(collection, id, fields, defaults)
                    .await
            }
            AnyStore::Memory(store) => {
                store
                    .merge_set_with_defaults(collection, id, fields, defaults)
                    .await
            }
        }
    }

    async fn scan_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        match self {
            AnyStore::Sqlite(store) => store.scan_eq(collection, field, value, after, limit).await,
            AnyStore::Memory(store) => store.scan_eq(collection, field, value, after, limit).await,
        }
    }

    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<usize, StoreError> {
        match self {
            AnyStore::Sqlite(store) => store.batch_delete(collection, ids).await,
            AnyStore::Memory(store) => store.batch_delete(collection, ids).await,
        }
    }
}

/// Merge `patch` into `existing`, key by key.
pub fn merge_into(existing: &mut Document, patch: Document) {
    for (key, value) in patch {
        existing.insert(key, value);
    }
}

/// Delete every article written under `author`.
///
/// Scans the collection one page at a time and deletes each page as a batch.
/// This is a maintenance operation and is never called by the crawl itself.
#[instrument(level = "info", skip(store))]
pub async fn purge_by_author<S: DocumentStore>(
    store: &S,
    collection: &str,
    author: &str,
    page_size: usize,
) -> Result<usize, StoreError> {
    let needle = Value::String(author.to_string());
    let page_size = page_size.max(1);
    let mut cursor: Option<String> = None;
    let mut removed = 0usize;

    loop {
        let ids = store
            .scan_eq(collection, "author", &needle, cursor.as_deref(), page_size)
            .await?;
        if ids.is_empty() {
            break;
        }

        removed += store.batch_delete(collection, &ids).await?;
        info!(batch = ids.len(), removed, "Deleted batch of articles");

        if ids.len() < page_size {
            break;
        }
        cursor = ids.last().cloned();
    }

    Ok(removed)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_into_keeps_untouched_keys() {
        let mut existing = doc(json!({"title": "T", "body": "B"}));
        merge_into(&mut existing, doc(json!({"excerpt": "E", "title": "T2"})));

        assert_eq!(existing["title"], json!("T2"));
        assert_eq!(existing["body"], json!("B"));
        assert_eq!(existing["excerpt"], json!("E"));
    }

    #[tokio::test]
    async fn test_purge_by_author_walks_every_page() {
        let store = MemoryStore::new();
        for i in 0..7 {
            let id = format!("id{i:02}");
            store
                .merge_set("articles", &id, doc(json!({"author": "Redazione"})))
                .await
                .unwrap();
        }
        store
            .merge_set("articles", "keep", doc(json!({"author": "Someone Else"})))
            .await
            .unwrap();

        let removed = purge_by_author(&store, "articles", "Redazione", 3)
            .await
            .unwrap();

        assert_eq!(removed, 7);
        assert!(store.exists("articles", "keep").await.unwrap());
        assert!(!store.exists("articles", "id00").await.unwrap());
        assert!(!store.exists("articles", "id06").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_selects_backend() {
        assert!(matches!(open("memory").await.unwrap(), AnyStore::Memory(_)));
        let sqlite = open("sqlite::memory:").await.unwrap();
        assert!(matches!(sqlite, AnyStore::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_open_unreachable_store_fails() {
        let url = "sqlite:///definitely/not/a/dir/articles.db";
        let err = open(url).await.unwrap_err();
        assert!(matches!(err, StoreError::Connect(_)));
    }

    #[tokio::test]
    async fn test_purge_by_author_with_no_matches() {
        let store = MemoryStore::new();
        let removed = purge_by_author(&store, "articles", "Nobody", 10)
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }
}

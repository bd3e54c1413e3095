//! In-process document store.

use super::{Document, DocumentStore, StoreError, merge_into};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// A document store held entirely in memory.
///
/// Collections are ordered by id so scans paginate the same way the SQLite
/// backend does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    #[cfg(test)]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .get(collection)
            .map_or(0, |docs| docs.len())
    }
}

impl DocumentStore for MemoryStore {
    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id)))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn merge_set_with_defaults(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        defaults: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock();
        let existing = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (key, value) in defaults {
            existing.entry(key).or_insert(value);
        }
        merge_into(existing, fields);
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
        let collections = self.collections.lock();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(id, _)| after.is_none_or(|cursor| id.as_str() > cursor))
            .filter(|(_, doc)| doc.get(field) == Some(value))
            .take(limit)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<usize, StoreError> {
        let mut collections = self.collections.lock();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let removed = ids.iter().filter(|id| docs.remove(id.as_str()).is_some());
        Ok(removed.count())
    }
}

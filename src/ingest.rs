//! Ingestion writer: normalizes extracted fields into article records.
//!
//! Every write is a merge-upsert keyed by article id and stamps
//! `processed: false` for the enrichment stage. Fields an adapter did not
//! produce are left out of the payload, so a partial extraction never wipes
//! values stored by an earlier, more complete one. Source defaults are
//! written beneath the stored document and only fill keys it lacks.

use crate::models::{ArticlePatch, ArticleRecord, RawFields};
use crate::store::{Document, DocumentStore, StoreError};
use serde_json::Value;
use tracing::{debug, instrument};

/// Per-source values used when a page doesn't provide them.
#[derive(Debug, Clone, Copy)]
pub struct SourceDefaults<'a> {
    pub author: &'a str,
}

/// Build the merge payload for one article.
pub fn patch(id: &str, fields: RawFields) -> ArticlePatch {
    ArticlePatch {
        id: id.to_string(),
        title: fields.title,
        body: fields.body,
        excerpt: fields.excerpt,
        date: fields.date,
        url: fields.url,
        author: fields.author,
        img_link: fields.img_link,
        processed: false,
    }
}

impl SourceDefaults<'_> {
    fn to_document(self) -> Document {
        let mut document = Document::new();
        document.insert("author".to_string(), Value::from(self.author));
        document
    }
}

fn to_document(patch: &ArticlePatch) -> Result<Document, StoreError> {
    match serde_json::to_value(patch)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(patch.id.clone())),
    }
}

pub struct IngestWriter<'a, S> {
    store: &'a S,
    collection: &'a str,
}

impl<'a, S: DocumentStore> IngestWriter<'a, S> {
    pub fn new(store: &'a S, collection: &'a str) -> Self {
        Self { store, collection }
    }

    /// Merge-upsert one article.
    #[instrument(level = "debug", skip_all, fields(%id, collection = %self.collection))]
    pub async fn write(
        &self,
        id: &str,
        fields: RawFields,
        defaults: SourceDefaults<'_>,
    ) -> Result<(), StoreError> {
        let payload = patch(id, fields);
        let document = to_document(&payload)?;
        let defaults = defaults.to_document();
        debug!(fields = document.len(), "Writing article");
        self.store
            .merge_set_with_defaults(self.collection, id, document, defaults)
            .await
    }

    /// Read an article back as a record.
    pub async fn read(&self, id: &str) -> Result<Option<ArticleRecord>, StoreError> {
        match self.store.get(self.collection, id).await? {
            Some(document) => Ok(Some(serde_json::from_value(Value::Object(document))?)),
            None => Ok(None),
        }
    }
}

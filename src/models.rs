//! Data models for crawl candidates and persisted article records.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`SourceId`]: Which supported site an item belongs to
//! - [`CandidateUrl`]: A discovered article URL waiting in the work queue
//! - [`RawFields`]: What a source adapter pulled off a detail page
//! - [`ArticleRecord`]: The canonical persisted article
//! - [`ArticlePatch`]: The merge payload written by the ingestion writer
//!
//! Persisted records use camelCase field names (`imgLink`) to stay compatible
//! with the downstream enrichment stage that reads the same collection.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported news source.
///
/// The string form (`ai4business`, `wired`, ...) is used in config files,
/// CLI flags, log fields and the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    #[value(name = "ai4business")]
    Ai4Business,
    #[value(name = "wired")]
    Wired,
    #[value(name = "techcrunch")]
    TechCrunch,
    #[value(name = "ainews")]
    AiNews,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Ai4Business => "ai4business",
            SourceId::Wired => "wired",
            SourceId::TechCrunch => "techcrunch",
            SourceId::AiNews => "ainews",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered article URL waiting to be fetched.
///
/// Produced by discovery and consumed by exactly one worker lane. The `id`
/// is computed once during discovery from the source's identity seed and
/// carried through so the worker writes under the same key it was
/// deduplicated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    /// Absolute article URL.
    pub url: String,
    /// The source whose listing produced this URL.
    pub source: SourceId,
    /// Storage key derived during discovery.
    pub id: String,
    /// Title text from the listing link, used when the detail page has none.
    pub listing_title: String,
}

/// Fields extracted from one article detail page.
///
/// Everything except `title` is optional: a field that is `None` is left out
/// of the merge write so previously stored values survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub title: String,
    pub body: Option<String>,
    pub excerpt: Option<String>,
    /// Always normalized to `YYYY-MM-DD` by the source's date rule.
    pub date: Option<String>,
    pub url: String,
    pub author: Option<String>,
    pub img_link: Option<String>,
}

/// The canonical article record as stored in the article collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub img_link: Option<String>,
    #[serde(default)]
    pub processed: bool,
}

/// The merge payload for one article write.
///
/// Absent fields are skipped during serialization, so a merge-upsert never
/// erases what an earlier write stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_link: Option<String>,
    pub processed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_round_trips_through_serde() {
        let json = serde_json::to_string(&SourceId::TechCrunch).unwrap();
        assert_eq!(json, "\"techcrunch\"");
        let back: SourceId = serde_json::from_str("\"ainews\"").unwrap();
        assert_eq!(back, SourceId::AiNews);
    }

    #[test]
    fn test_source_id_display_matches_serde_name() {
        assert_eq!(SourceId::Ai4Business.to_string(), "ai4business");
        assert_eq!(SourceId::Wired.as_str(), "wired");
    }

    #[test]
    fn test_patch_omits_missing_fields() {
        let patch = ArticlePatch {
            id: "abc".to_string(),
            title: "Title".to_string(),
            body: None,
            excerpt: Some("Lead".to_string()),
            date: None,
            url: "https://example.com/a".to_string(),
            author: None,
            img_link: Some("https://example.com/a.jpg".to_string()),
            processed: false,
        };

        let value = serde_json::to_value(&patch).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("imgLink"));
        assert!(obj.contains_key("excerpt"));
        assert!(!obj.contains_key("body"));
        assert!(!obj.contains_key("date"));
        assert_eq!(obj["processed"], serde_json::json!(false));
    }

    #[test]
    fn test_record_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "id": "abc",
            "title": "Only a title",
            "processed": true
        }"#;

        let record: ArticleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "Only a title");
        assert_eq!(record.body, "");
        assert_eq!(record.img_link, None);
        assert!(record.processed);
    }
}

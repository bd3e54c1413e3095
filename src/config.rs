//! Crawl settings.
//!
//! Settings come from three layers, lowest precedence first: built-in
//! defaults, an optional YAML file, then CLI flags / environment variables
//! (applied in [`crate::cli`]).
//!
//! ```yaml
//! concurrency: 3
//! navigation_timeout_secs: 120
//! listing_delay_ms: 500
//! collection: articles
//! store_url: sqlite://articles.db
//! engine: chrome
//! sources: [ai4business, techcrunch]
//! pagination:
//!   techcrunch: 2
//! report_dir: ./reports
//! ```

use crate::models::SourceId;
use crate::render::EngineKind;
use crate::scrapers::{self, SourceAdapter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of worker lanes draining the queue.
    pub concurrency: usize,
    /// Limit for one page load (navigation plus content read).
    pub navigation_timeout_secs: u64,
    /// Base pause between listing pages of one source; jitter is added on top.
    pub listing_delay_ms: u64,
    /// Article collection name in the document store.
    pub collection: String,
    /// `sqlite://path.db`, `sqlite::memory:` or `memory`.
    pub store_url: String,
    pub engine: EngineKind,
    pub chrome_executable: Option<PathBuf>,
    /// Sources to crawl; all of them when unset.
    pub sources: Option<Vec<SourceId>>,
    /// Per-source override of the pagination bound.
    pub pagination: BTreeMap<SourceId, u32>,
    /// Where to write JSON run reports, if anywhere.
    pub report_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: 3,
            navigation_timeout_secs: 120,
            listing_delay_ms: 500,
            collection: "articles".to_string(),
            store_url: "sqlite://articles.db".to_string(),
            engine: EngineKind::Chrome,
            chrome_executable: None,
            sources: None,
            pagination: BTreeMap::new(),
            report_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no file is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?settings, "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.navigation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "navigation_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "collection must not be empty".to_string(),
            ));
        }
        if let Some((source, _)) = self.pagination.iter().find(|(_, bound)| **bound == 0) {
            return Err(ConfigError::Invalid(format!(
                "pagination bound for {source} must be at least 1"
            )));
        }
        Ok(())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn listing_delay(&self) -> Duration {
        Duration::from_millis(self.listing_delay_ms)
    }

    /// The enabled source adapters, in crawl order, with pagination overrides applied.
    pub fn adapters(&self) -> Vec<SourceAdapter> {
        scrapers::all()
            .into_iter()
            .filter(|adapter| {
                self.sources
                    .as_ref()
                    .is_none_or(|enabled| enabled.contains(&adapter.id))
            })
            .map(|mut adapter| {
                if let Some(bound) = self.pagination.get(&adapter.id) {
                    adapter.pagination_bound = *bound;
                }
                adapter
            })
            .collect()
    }
}

//! Run orchestration.
//!
//! A run moves through four phases, always in this order:
//!
//! | Phase | What happens |
//! |-------|--------------|
//! | `init` | Settings validated, render engine started |
//! | `discover` | Each enabled source is discovered in turn, filling one shared queue |
//! | `drain` | The worker pool empties the queue: route, extract, write |
//! | `shutdown` | The render engine is released, whatever happened before |
//!
//! Only setup failures (bad settings, an engine that won't start, a store
//! that can't be opened) end a run with an error. Failed listing pages and
//! failed articles are logged, counted in the [`RunReport`] and skipped.

use crate::config::{ConfigError, Settings};
use crate::discovery::discover;
use crate::ingest::{IngestWriter, SourceDefaults};
use crate::models::{CandidateUrl, SourceId};
use crate::outputs::report::{ItemOutcome, RunReport, write_report};
use crate::pool::{WorkQueue, drain};
use crate::render::{ChromeEngine, ChromeOptions, EngineKind, HttpEngine, RenderEngine, RenderError};
use crate::scrapers::{self, ExtractError, Extraction, SourceAdapter};
use crate::store::{DocumentStore, StoreError};
use crate::utils::truncate_for_log;
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Discover,
    DrainPool,
    Shutdown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "init",
            Phase::Discover => "discover",
            Phase::DrainPool => "drain",
            Phase::Shutdown => "shutdown",
        })
    }
}

/// A setup failure that ends the run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid settings: {0}")]
    Config(#[from] ConfigError),
    #[error("render engine failed to start: {0}")]
    Engine(RenderError),
    #[error("document store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// State owned by a single run. Dropped when the run ends.
struct RunContext {
    queue: WorkQueue<CandidateUrl>,
    /// Ids queued or found known so far, across all sources.
    seen: HashSet<String>,
    report: RunReport,
}

impl RunContext {
    fn new() -> Self {
        Self {
            queue: WorkQueue::new(),
            seen: HashSet::new(),
            report: RunReport::new(Utc::now()),
        }
    }
}

/// Route, extract and store one article.
async fn process_item<E: RenderEngine, S: DocumentStore>(
    engine: &E,
    writer: &IngestWriter<'_, S>,
    adapters: &[SourceAdapter],
    timeout: Duration,
    candidate: CandidateUrl,
) -> (SourceId, ItemOutcome) {
    let Some(adapter) = scrapers::route(adapters, &candidate.url) else {
        let e = ExtractError::NoAdapter(candidate.url.clone());
        warn!(
            source = %candidate.source,
            url = %candidate.url,
            error = %e,
            "Failed to extract article"
        );
        return (candidate.source, ItemOutcome::Failed);
    };

    let outcome = match adapter.extract(engine, &candidate, timeout).await {
        Extraction::Accepted(fields) => {
            let title = truncate_for_log(&fields.title, 80);
            let defaults = SourceDefaults {
                author: adapter.default_author,
            };
            match writer.write(&candidate.id, fields, defaults).await {
                Ok(()) => {
                    info!(source = %adapter.id, id = %candidate.id, %title, "Stored article");
                    ItemOutcome::Accepted
                }
                Err(e) => {
                    error!(
                        source = %adapter.id,
                        id = %candidate.id,
                        url = %candidate.url,
                        error = %e,
                        "Failed to write article"
                    );
                    ItemOutcome::WriteFailed
                }
            }
        }
        Extraction::Rejected(reason) => {
            info!(
                source = %adapter.id,
                url = %candidate.url,
                %reason,
                "Article rejected by content policy; not stored"
            );
            ItemOutcome::Rejected
        }
        Extraction::Failed(e) => {
            warn!(
                source = %adapter.id,
                url = %candidate.url,
                error = %e,
                "Failed to extract article"
            );
            ItemOutcome::Failed
        }
    };
    (adapter.id, outcome)
}

/// Discover every source, then drain the queue.
///
/// Sources are discovered one after another; only the drain runs lanes
/// concurrently. Never fails: per-page and per-item errors end up as counters.
#[instrument(
    level = "info",
    skip_all,
    fields(sources = adapters.len(), concurrency = settings.concurrency)
)]

pub async fn crawl<E: RenderEngine, S: DocumentStore>(
    engine: &E,
    store: &S,
    adapters: &[SourceAdapter],
    settings: &Settings,
) -> RunReport {
    let started = Instant::now();
    let mut ctx = RunContext::new();

    info!(phase = %Phase::Discover, "Starting discovery");
    for adapter in adapters {
        let stats = discover(engine, store, adapter, settings, &ctx.queue, &mut ctx.seen)
            .await;
        ctx.report.source_mut(adapter.id).discovery = stats;
    }

    info!(phase = %Phase::DrainPool, queued = ctx.queue.len(), "Draining work queue");
    let writer = IngestWriter::new(store, &settings.collection);
    let timeout = settings.navigation_timeout();
    let outcomes = drain(&ctx.queue, settings.concurrency, |candidate| {
        process_item(engine, &writer, adapters, timeout, candidate)
    })
    .await;

    for (source, outcome) in outcomes {
        ctx.report.record(source, outcome);
    }
    ctx.report.elapsed_ms = started.elapsed().as_millis() as u64;
    ctx.report
}

/// Crawl with an already started engine, then shut it down.
pub async fn run_with_engine<E: RenderEngine, S: DocumentStore>(
    engine: E,
    store: &S,
    adapters: &[SourceAdapter],
    settings: &Settings,
) -> RunReport {
    let report = crawl(&engine, store, adapters, settings).await;

    info!(phase = %Phase::Shutdown, "Releasing render engine");
    if let Err(e) = engine.shutdown().await {
        warn!(error = %e, "Render engine did not shut down cleanly");
    }
    report
}

/// Run every enabled source to completion.
///
/// Starts the configured engine, crawls, shuts the engine down and writes
/// the JSON report when a report directory is set.
pub async fn run<S: DocumentStore>(
    settings: &Settings,
    store: &S,
) -> Result<RunReport, CrawlError> {
    settings.validate()?;
    let adapters = settings.adapters();
    info!(
        phase = %Phase::Init,
        engine = ?settings.engine,
        sources = %adapters.iter().map(|a| a.id.as_str()).collect::<Vec<_>>().join(","),
        "Starting run"
    );

    let report = match settings.engine {
        EngineKind::Chrome => {
            let options = ChromeOptions {
                executable: settings.chrome_executable.clone(),
                request_timeout: settings.navigation_timeout(),
            };
            let engine = ChromeEngine::launch(&options).await.map_err(|e| {
                error!(error = %e, "Failed to launch headless browser");
                CrawlError::Engine(e)
            })?;
            run_with_engine(engine, store, &adapters, settings).await
        }
        EngineKind::Http => {
            let timeout = settings.navigation_timeout();
            let engine = HttpEngine::new(timeout).map_err(CrawlError::Engine)?;

            run_with_engine(engine, store, &adapters, settings).await
        }
    };

    let totals = report.totals();
    info!(
        elapsed_ms = report.elapsed_ms,
        queued = totals.discovery.enqueued,
        stored = totals.accepted,
        rejected = totals.rejected,
        failed = totals.failed,
        write_failed = totals.write_failed,
        "Run completed"
    );

    if let Some(dir) = &settings.report_dir {
        if let Err(e) = write_report(&report, dir).await {
            error!(report_dir = %dir, error = %e, "Failed to write run report");
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::identity;
    use crate::render::fake::FakeEngine;
    use crate::scrapers::test_adapter;
    use crate::store::flaky::FlakyStore;
    use crate::store::{Document, MemoryStore};
    use serde_json::Value;
    use std::sync::atomic::Ordering;

    fn settings() -> Settings {
        Settings {
            listing_delay_ms: 0,
            concurrency: 2,
            ..Settings::default()
        }
    }

    fn listing(links: &[(&str, &str)]) -> String {
        let mut html = String::from("<ul>");
        for (title, href) in links {
            html.push_str(&format!(r#"<li><a href="{href}">{title}</a></li>"#));
        }
        html + "</ul>"
    }

    fn detail(title: &str, body: &str) -> String {
        format!(
            r#"<h1>{title}</h1><time datetime="2024-03-01T09:00:00Z"></time><p>{body}</p>"#
        )
    }

    fn site() -> FakeEngine {
        FakeEngine::new([
            (
                "https://news.test/list/1".to_string(),
                listing(&[("Title A", "/a"), ("Title B", "/b"), ("Title C", "/c")]),
            ),
            ("https://news.test/list/2".to_string(), listing(&[])),
            (
                "https://news.test/a".to_string(),
                detail("Title A", "Models keep improving."),
            ),
            (
                "https://news.test/b".to_string(),
                detail("Title B", "This is Sponsored content from a partner."),
            ),
        ])
    }

    async fn run_site<S: DocumentStore>(engine: &FakeEngine, store: &S) -> RunReport {
        run_with_engine(engine.clone(), store, &[test_adapter()], &settings())
            .await
    }

    #[tokio::test]
    async fn test_run_stores_accepted_articles_only() {
        let engine = site();
        let store = MemoryStore::new();

        let report = run_site(&engine, &store).await;

        let accepted = identity("Title A");
        let stored = store.get("articles", &accepted).await.unwrap().unwrap();
        assert_eq!(stored["title"], Value::from("Title A"));
        assert_eq!(stored["date"], Value::from("2024-03-01"));
        assert_eq!(stored["author"], Value::from("Test Desk"));
        assert_eq!(stored["processed"], Value::Bool(false));

        let rejected = identity("Title B");
        assert!(!store.exists("articles", &rejected).await.unwrap());
        assert_eq!(store.len("articles"), 1);

        let wired = &report.sources[&SourceId::Wired];
        assert_eq!(wired.discovery.enqueued, 3);
        assert_eq!(wired.accepted, 1);
        assert_eq!(wired.rejected, 1);
        assert_eq!(wired.failed, 1);
    }

    #[tokio::test]
    async fn test_engine_released_and_pages_closed() {
        let engine = site();
        let store = MemoryStore::new();

        run_site(&engine, &store).await;

        let state = &engine.state;
        assert!(state.shut_down.load(Ordering::SeqCst));
        assert_eq!(
            state.opened.load(Ordering::SeqCst),
            state.closed.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_second_run_fetches_no_known_articles() {
        let engine = site();
        let store = MemoryStore::new();
        store
            .merge_set("articles", &identity("Title B"), Document::new())
            .await
            .unwrap();
        store
            .merge_set("articles", &identity("Title C"), Document::new())
            .await
            .unwrap();

        run_site(&engine, &store).await;
        let report = run_site(&engine, &store).await;

        let wired = &report.sources[&SourceId::Wired];
        assert_eq!(wired.discovery.enqueued, 0);
        assert_eq!(wired.discovery.already_known, 3);
        let detail_visits = engine
            .state
            .visits
            .lock()
            .iter()
            .filter(|url| !url.contains("/list/"))
            .count();
        assert_eq!(detail_visits, 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_other_writes() {
        let engine = FakeEngine::new([
            (
                "https://news.test/list/1".to_string(),
                listing(&[("Title A", "/a"), ("Title D", "/d")]),
            ),
            ("https://news.test/list/2".to_string(), listing(&[])),
            (
                "https://news.test/a".to_string(),
                detail("Title A", "First story."),
            ),
            (
                "https://news.test/d".to_string(),
                detail("Title D", "Second story."),
            ),
        ]);
        let refused = identity("Title A");
        let store = FlakyStore {
            failing_writes: [refused.clone()].into(),
            ..FlakyStore::default()
        };

        let report = run_site(&engine, &store).await;

        let wired = &report.sources[&SourceId::Wired];
        assert_eq!(wired.write_failed, 1);
        assert_eq!(wired.accepted, 1);
        let written = identity("Title D");
        assert!(!store.inner.exists("articles", &refused).await.unwrap());
        assert!(store.inner.exists("articles", &written).await.unwrap());
        assert!(engine.state.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unrouted_candidate_counts_as_failure() {
        let engine = FakeEngine::default();
        let store = MemoryStore::new();
        let writer = IngestWriter::new(&store, "articles");
        let candidate = CandidateUrl {
            url: "https://elsewhere.test/x".to_string(),
            source: SourceId::AiNews,
            id: identity("X"),
            listing_title: "X".to_string(),
        };

        let adapters = [test_adapter()];
        let timeout = Duration::from_secs(5);
        let outcome = process_item(&engine, &writer, &adapters, timeout, candidate)
            .await;

        assert_eq!(outcome, (SourceId::AiNews, ItemOutcome::Failed));
        assert_eq!(engine.state.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_the_run() {
        let settings = Settings {
            concurrency: 0,
            ..Settings::default()
        };
        let err = run(&settings, &MemoryStore::new()).await.unwrap_err();
        assert!(matches!(err, CrawlError::Config(_)));
    }

    #[tokio::test]
    async fn test_run_with_no_sources_completes() {
        let settings = Settings {
            engine: EngineKind::Http,
            sources: Some(Vec::new()),
            ..Settings::default()
        };
        let report = run(&settings, &MemoryStore::new()).await.unwrap();
        assert!(report.sources.is_empty());
        assert!(report.to_string().starts_with("COMPLETED"));
    }
}

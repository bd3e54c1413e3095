//! # Awful News Ingest
//!
//! Crawls a fixed set of AI news sites, skips articles that are already
//! stored, and writes normalized article records into a document store where
//! a separate enrichment stage picks them up (`processed: false`).
//!
//! ## Features
//!
//! - Four source adapters (AI4Business, Wired Italia, TechCrunch, AI News),
//!   each a configuration of one shared extraction routine
//! - Headless Chrome (chromiumoxide) or plain HTTP page rendering
//! - Deterministic article ids, checked against the store before fetching
//! - Bounded worker lanes draining one shared queue
//! - Merge-upsert writes into SQLite or an in-memory store
//! - One-shot CLI run, an HTTP trigger, and an author purge for cleanup
//!
//! ## Usage
//!
//! ```sh
//! awful_news_ingest crawl
//! awful_news_ingest -c ingest.yaml serve --bind 0.0.0.0:8080
//! awful_news_ingest purge-author --author "Redazione AI4Business"
//! awful_news_ingest show --id 3f1c...
//! ```
//!
//! ## Architecture
//!
//! A run is a straight pipeline:
//! 1. **Discovery**: walk each source's listing pages, queue unknown article URLs
//! 2. **Drain**: worker lanes pop URLs, route them to their adapter and extract fields
//! 3. **Ingest**: accepted articles are merge-written under their id
//! 4. **Shutdown**: the render engine is released and a summary reported

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod discovery;
mod identity;
mod ingest;
mod models;
mod orchestrator;
mod outputs;
mod pool;
mod render;
mod scrapers;
mod server;
mod store;
mod utils;

use cli::{Cli, Command};
use ingest::IngestWriter;
use orchestrator::CrawlError;
use server::AppState;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_ingest starting up");

    let args = Cli::parse();
    let settings = args.settings()?;
    debug!(?settings, "Resolved settings");

    match args.command {
        Command::Sources => {
            for adapter in settings.adapters() {
                println!(
                    "{:<12} pages 1..={:<3} {:<24} {}",
                    adapter.id,
                    adapter.pagination_bound,
                    adapter.default_author,
                    adapter.listing_url
                );
            }
        }
        Command::Crawl(_) => {
            if let Some(dir) = &settings.report_dir {
                if let Err(e) = ensure_writable_dir(dir).await {
                    error!(path = %dir, error = %e, "Report directory is not writable");
                    return Err(e);
                }
            }

            let store = store::open(&settings.store_url)
                .await
                .map_err(CrawlError::from)?;
            match orchestrator::run(&settings, &store).await {
                Ok(report) => print!("{report}"),
                Err(e) => {
                    error!(error = %e, "Run failed");
                    return Err(e.into());
                }
            }
        }
        Command::Serve { bind, .. } => {
            let store = store::open(&settings.store_url)
                .await
                .map_err(CrawlError::from)?;
            server::serve(&bind, AppState::new(settings, store)).await?;
        }
        Command::PurgeAuthor { author, page_size } => {
            let store = store::open(&settings.store_url)
                .await
                .map_err(CrawlError::from)?;
            let removed = store::purge_by_author(&store, &settings.collection, &author, page_size)
                .await?;

            println!("Removed {removed} articles by {author}");
        }
        Command::Show { id } => {
            let store = store::open(&settings.store_url)
                .await
                .map_err(CrawlError::from)?;
            let writer = IngestWriter::new(&store, &settings.collection);
            match writer.read(&id).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("No article {id} in {}", settings.collection),
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

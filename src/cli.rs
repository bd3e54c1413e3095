//! Command-line interface definitions.
//!
//! Every option can also come from an environment variable. Values given
//! here override the settings file, which overrides the built-in defaults.

use crate::config::{ConfigError, Settings};
use crate::models::SourceId;
use crate::render::EngineKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Crawl every source into the default SQLite file
/// awful_news_ingest crawl
///
/// # Two sources, plain HTTP, nothing persisted
/// awful_news_ingest --store memory crawl --engine http --source wired --source techcrunch
///
/// # Serve the HTTP trigger
/// awful_news_ingest -c ingest.yaml serve --bind 0.0.0.0:8080
///
/// # Remove everything filed under a house byline
/// awful_news_ingest purge-author --author "Redazione AI4Business"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Document store: sqlite://path.db, sqlite::memory: or memory
    #[arg(long = "store", global = true, env = "INGEST_STORE_URL")]
    pub store_url: Option<String>,

    /// Article collection name
    #[arg(long, global = true, env = "INGEST_COLLECTION")]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every enabled source once and print the summary
    Crawl(CrawlArgs),
    /// Serve POST /scrape and GET /health
    Serve {
        /// Address to listen on
        #[arg(long, env = "INGEST_BIND", default_value = "127.0.0.1:8080")]
        bind: String,

        #[command(flatten)]
        crawl: CrawlArgs,
    },
    /// Delete every stored article with the given author
    PurgeAuthor {
        #[arg(long)]
        author: String,

        /// Documents scanned and deleted per batch
        #[arg(long, default_value_t = 200)]
        page_size: usize,
    },
    /// Print one stored article as JSON
    Show {
        #[arg(long)]
        id: String,
    },
    /// List the source adapters and their settings
    Sources,
}

/// Overrides for the crawl itself.
#[derive(Args, Debug, Default, Clone)]
pub struct CrawlArgs {
    /// Worker lanes draining the queue
    #[arg(long, env = "INGEST_CONCURRENCY")]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum, env = "INGEST_ENGINE")]
    pub engine: Option<EngineKind>,

    /// Chrome/Chromium binary to launch
    #[arg(long, env = "CHROME_EXECUTABLE")]
    pub chrome_executable: Option<PathBuf>,

    /// Per-page load limit in seconds
    #[arg(long, env = "INGEST_NAVIGATION_TIMEOUT")]
    pub navigation_timeout_secs: Option<u64>,

    /// Base pause between listing pages, in milliseconds
    #[arg(long, env = "INGEST_LISTING_DELAY_MS")]
    pub listing_delay_ms: Option<u64>,

    /// Only crawl these sources (repeatable)
    #[arg(long = "source", value_enum)]
    pub sources: Vec<SourceId>,

    /// Directory for JSON run reports
    #[arg(long, env = "INGEST_REPORT_DIR")]
    pub report_dir: Option<String>,
}

impl Cli {
    /// Load the settings file (if any) and apply command-line overrides.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(url) = &self.store_url {
            settings.store_url = url.clone();
        }
        if let Some(collection) = &self.collection {
            settings.collection = collection.clone();
        }
        match &self.command {
            Command::Crawl(args) | Command::Serve { crawl: args, .. } => args.apply(&mut settings),
            Command::PurgeAuthor { .. } | Command::Show { .. } | Command::Sources => {}
        }
        settings.validate()?;
        Ok(settings)
    }
}

impl CrawlArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(engine) = self.engine {
            settings.engine = engine;
        }
        if let Some(path) = &self.chrome_executable {
            settings.chrome_executable = Some(path.clone());
        }
        if let Some(secs) = self.navigation_timeout_secs {
            settings.navigation_timeout_secs = secs;
        }
        if let Some(delay) = self.listing_delay_ms {
            settings.listing_delay_ms = delay;
        }
        if !self.sources.is_empty() {
            settings.sources = Some(self.sources.clone());
        }
        if let Some(dir) = &self.report_dir {
            settings.report_dir = Some(dir.clone());
        }
    }
}

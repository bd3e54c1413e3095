//! Run reports.
//!
//! A [`RunReport`] collects per-source counters for one crawl. It is logged at
//! the end of every run, returned as the `/scrape` response body and, when a
//! report directory is configured, written as JSON.
//!
//! # Output Structure
//!
//! ```text
//! report_dir/
//! └── 2025-05-06/
//!     ├── 071502.json
//!     └── 190004.json
//! ```

use crate::discovery::DiscoveryStats;
use crate::models::SourceId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use tokio::fs;
use tracing::{error, info, instrument};

/// What happened to one dequeued article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Accepted,
    Rejected,
    Failed,
    WriteFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub discovery: DiscoveryStats,
    pub accepted: u32,
    pub rejected: u32,
    pub failed: u32,
    pub write_failed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub sources: BTreeMap<SourceId, SourceReport>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            elapsed_ms: 0,
            sources: BTreeMap::new(),
        }
    }

    pub fn source_mut(&mut self, source: SourceId) -> &mut SourceReport {
        self.sources.entry(source).or_default()
    }

    pub fn record(&mut self, source: SourceId, outcome: ItemOutcome) {
        let entry = self.source_mut(source);
        match outcome {
            ItemOutcome::Accepted => entry.accepted += 1,
            ItemOutcome::Rejected => entry.rejected += 1,
            ItemOutcome::Failed => entry.failed += 1,
            ItemOutcome::WriteFailed => entry.write_failed += 1,
        }
    }

    /// Sum of every source's counters.
    pub fn totals(&self) -> SourceReport {
        let mut acc = SourceReport::default();
        for s in self.sources.values() {
            acc.discovery.pages_fetched += s.discovery.pages_fetched;
            acc.discovery.page_errors += s.discovery.page_errors;
            acc.discovery.links_seen += s.discovery.links_seen;
            acc.discovery.already_known += s.discovery.already_known;
            acc.discovery.duplicates += s.discovery.duplicates;
            acc.discovery.lookup_errors += s.discovery.lookup_errors;
            acc.discovery.enqueued += s.discovery.enqueued;
            acc.accepted += s.accepted;
            acc.rejected += s.rejected;
            acc.failed += s.failed;
            acc.write_failed += s.write_failed;
        }
        acc
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = self.totals();
        writeln!(
            f,
            "COMPLETED in {:.1}s: {} queued, {} stored, {} rejected, {} failed, {} write errors",
            self.elapsed_ms as f64 / 1000.0,
            totals.discovery.enqueued,
            totals.accepted,
            totals.rejected,
            totals.failed,
            totals.write_failed,
        )?;
        for (source, s) in &self.sources {
            let d = &s.discovery;
            write!(
                f,
                "  {source}: pages {} ({} errors), known {}",
                d.pages_fetched,
                d.page_errors,
                d.already_known,
            )?;
            writeln!(
                f,
                ", queued {}, stored {}, rejected {}, failed {}",
                d.enqueued,
                s.accepted,
                s.rejected,
                s.failed + s.write_failed,
            )?;
        }
        Ok(())
    }
}

/// Write `report` as JSON under `{report_dir}/{YYYY-MM-DD}/{HHMMSS}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(report_dir = %report_dir))]
pub async fn write_report(
    report: &RunReport,
    report_dir: &str,
) -> Result<String, Box<dyn Error + Send + Sync>> {

    let json = serde_json::to_string_pretty(report)?;

    let day_dir = format!("{}/{}", report_dir, report.started_at.format("%Y-%m-%d"));
    if let Err(e) = fs::create_dir_all(&day_dir).await {
        error!(%day_dir, error = %e, "Failed to create report dir");
        return Err(e.into());
    }

    let path = format!("{}/{}.json", day_dir, report.started_at.format("%H%M%S"));
    fs::write(&path, json).await?;
    info!(%path, "Wrote run report");

    Ok(path)
}

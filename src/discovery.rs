//! Discovery: find article URLs that are not stored yet.
//!
//! For one source, walks listing pages from 1 up to the pagination bound,
//! stopping early at the first page with no article links. Each link is keyed
//! with the source's identity seed, checked against the store and queued only
//! if unknown. A listing page that fails to load is logged and skipped.

use crate::config::Settings;
use crate::models::CandidateUrl;
use crate::pool::WorkQueue;
use crate::render::{RenderEngine, render_html};
use crate::scrapers::SourceAdapter;
use crate::store::DocumentStore;
use rand::{Rng, rng};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Per-source discovery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub pages_fetched: u32,
    pub page_errors: u32,
    pub links_seen: u32,
    /// Links whose id is already in the store.
    pub already_known: u32,
    /// Links already seen earlier in this run.
    pub duplicates: u32,
    /// Existence checks that failed; those links are queued anyway.
    pub lookup_errors: u32,
    pub enqueued: u32,
}

/// Sleep for `base` plus up to half of it again, so listing requests don't
/// land on a fixed beat.
async fn politeness_pause(base: Duration) {
    if base.is_zero() {
        return;
    }
    let max_jitter = base.as_millis() as u64 / 2;
    let jitter = rng().random_range(0..=max_jitter);
    sleep(base + Duration::from_millis(jitter)).await;
}

/// Run discovery for one source, pushing unknown articles onto `queue`.
///
/// `seen` holds every id encountered so far in this run, across sources,
/// so an article linked from several listing pages is queued once.
#[instrument(level = "info", skip_all, fields(source = %adapter.id))]
pub async fn discover<E: RenderEngine, S: DocumentStore>(
    engine: &E,
    store: &S,
    adapter: &SourceAdapter,
    settings: &Settings,
    queue: &WorkQueue<CandidateUrl>,
    seen: &mut HashSet<String>,
) -> DiscoveryStats {
    let mut stats = DiscoveryStats::default();
    let timeout = settings.navigation_timeout();

    for page in 1..=adapter.pagination_bound {
        if page > 1 {
            politeness_pause(settings.listing_delay()).await;
        }

        let page_url = adapter.listing_page_url(page);
        let links = match render_html(engine, &page_url, timeout).await {
            Ok(html) => adapter.parse_listing(&page_url, &html),
            Err(e) => Err(e),
        };
        let links = match links {
            Ok(links) => links,
            Err(e) => {
                stats.page_errors += 1;
                warn!(page, url = %page_url, error = %e, "Listing page failed; skipping");
                continue;
            }
        };

        stats.pages_fetched += 1;
        if links.is_empty() {
            info!(
                page,
                "Listing page has no article links; stopping pagination"
            );
            break;
        }
        debug!(page, links = links.len(), "Parsed listing page");

        for link in links {
            stats.links_seen += 1;
            let candidate = adapter.candidate(link);

            if !seen.insert(candidate.id.clone()) {
                stats.duplicates += 1;
                continue;
            }

            match store.exists(&settings.collection, &candidate.id).await {
                Ok(true) => {
                    stats.already_known += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    // A duplicate merge-write is harmless; a skipped article is lost until it
                    // shows up on a listing again.
                    stats.lookup_errors += 1;
                    warn!(
                        id = %candidate.id,
                        url = %candidate.url,
                        error = %e,
                        "Existence check failed; queueing anyway"
                    );

                }
            }

            debug!(id = %candidate.id, url = %candidate.url, "Queued article");
            queue.push(candidate);
            stats.enqueued += 1;
        }
    }

    info!(
        pages = stats.pages_fetched,
        page_errors = stats.page_errors,
        links = stats.links_seen,
        known = stats.already_known,
        queued = stats.enqueued,
        "Discovery finished"
    );
    stats
}

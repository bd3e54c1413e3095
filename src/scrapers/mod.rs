//! Source adapters for the supported news sites.
//!
//! Every site is described by one [`SourceAdapter`]: where its listing pages
//! live, which selectors find links and article fields, which URLs count as
//! articles, how its dates are written and whose name to use when no byline
//! is found. Adapters are plain configuration; the extraction logic below is
//! shared by all of them.
//!
//! # Supported Sources
//!
//! | Source | Module | Date convention | Identity seed |
//! |--------|--------|-----------------|---------------|
//! | AI4Business | [`ai4business`] | Italian label (`12 marzo 2024`) | title |
//! | Wired Italia | [`wired`] | ISO `datetime` attribute | title |
//! | TechCrunch | [`techcrunch`] | `/YYYY/MM/DD/` URL segment | canonical URL |
//! | AI News | [`ainews`] | English label, shifted +1 day | title |
//!
//! # Routing
//!
//! A URL is routed to the first adapter whose article pattern matches it
//! (see [`route`]).

use crate::identity::identity;
use crate::models::{CandidateUrl, RawFields, SourceId};
use crate::render::snapshot::{compile, element_text, non_empty_text};
use crate::render::{RenderEngine, RenderError, Snapshot, render_html};
use crate::utils::first_line;
use itertools::Itertools;
use regex::Regex;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub mod ai4business;
pub mod ainews;
pub mod dates;
pub mod techcrunch;
pub mod wired;

/// Which field a source's article id is derived from.
///
/// Discovery and ingestion both go through [`SourceAdapter::identity_for`],
/// so the two phases always hash the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySeed {
    Title,
    /// The article URL without query string or fragment.
    Url,
}

/// How a source writes its publication date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// Italian `DD Month YYYY` text inside `selector`.
    ItalianLabel { selector: &'static str },
    /// ISO 8601 value in `attr` of the element matching `selector`.
    IsoAttribute {
        selector: &'static str,
        attr: &'static str,
    },
    /// `/YYYY/MM/DD/` segment of the article URL.
    UrlPath,
    /// English label inside `selector`, shifted forward one day.
    EnglishLabelNextDay { selector: &'static str },
}

/// Selectors for listing pages. `title` and `link` are relative to `item`.
#[derive(Debug, Clone, Copy)]
pub struct ListingSelectors {
    pub item: &'static str,
    pub title: &'static str,
    pub link: &'static str,
}

/// Selectors for article detail pages.
#[derive(Debug, Clone, Copy)]
pub struct DetailSelectors {
    pub title: &'static str,
    pub author: Option<&'static str>,
    pub excerpt: Option<&'static str>,
    /// Matches each body paragraph; their text is joined with newlines.
    pub body: &'static str,
    /// Element and attribute carrying the cover image URL.
    pub image: Option<(&'static str, &'static str)>,
}

/// Per-site crawl configuration and extraction policy.
#[derive(Debug, Clone)]
pub struct SourceAdapter {
    pub id: SourceId,
    /// Listing URL with a `{page}` placeholder.
    pub listing_url: &'static str,
    pub pagination_bound: u32,
    pub listing: ListingSelectors,
    pub detail: DetailSelectors,
    /// Absolute URLs matching this pattern are articles of this source.
    pub article_url: &'static Regex,
    pub date_rule: DateRule,
    pub identity_seed: IdentitySeed,
    pub default_author: &'static str,
    /// Case-insensitive body substrings that mark a page as not worth storing.
    pub blocklist: &'static [&'static str],
}

/// One (title, href) pair found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    pub title: String,
    pub url: String,
}

/// Why an extracted page was deliberately not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Blocklisted { marker: &'static str },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Blocklisted { marker } => {
                write!(f, "body contains blocklisted text {marker:?}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no title found on page")]
    MissingTitle,
    #[error("no source adapter matches {0}")]
    NoAdapter(String),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result of processing one detail page.
#[derive(Debug)]
pub enum Extraction {
    Accepted(RawFields),
    Rejected(RejectReason),
    Failed(ExtractError),
}

/// All supported sources, in crawl order.
pub fn all() -> Vec<SourceAdapter> {
    vec![
        ai4business::adapter(),
        wired::adapter(),
        techcrunch::adapter(),
        ainews::adapter(),
    ]
}

/// First adapter whose article pattern matches `url`.
pub fn route<'a>(adapters: &'a [SourceAdapter], url: &str) -> Option<&'a SourceAdapter> {
    adapters.iter().find(|adapter| adapter.matches(url))
}

/// `url` without query string or fragment; unparseable input is returned as is.
pub fn canonical_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

impl SourceAdapter {
    pub fn listing_page_url(&self, page: u32) -> String {
        self.listing_url.replace("{page}", &page.to_string())
    }

    pub fn matches(&self, url: &str) -> bool {
        self.article_url.is_match(url)
    }

    /// The storage id for an article of this source.
    pub fn identity_for(&self, title: &str, url: &str) -> String {
        match self.identity_seed {
            IdentitySeed::Title => identity(title),
            IdentitySeed::Url => identity(&canonical_url(url)),
        }
    }

    /// Turn a listing link into a queue entry.
    ///
    /// The entry carries the canonical URL, which is both fetched and stored.
    pub fn candidate(&self, link: ListingLink) -> CandidateUrl {
        CandidateUrl {
            id: self.identity_for(&link.title, &link.url),
            url: canonical_url(&link.url),
            source: self.id,
            listing_title: link.title,
        }
    }

    /// Extract article links from a listing page.
    ///
    /// Relative hrefs are resolved against `page_url`; links that do not
    /// match this source's article pattern are dropped, as are repeats.
    pub fn parse_listing(
        &self,
        page_url: &str,
        html: &str,
    ) -> Result<Vec<ListingLink>, RenderError> {
        let base = Url::parse(page_url).map_err(|e| RenderError::Navigation {
            url: page_url.to_string(),
            reason: e.to_string(),
        })?;
        let title_selector = compile(self.listing.title)?;
        let link_selector = compile(self.listing.link)?;

        let snapshot = Snapshot::parse(html);
        let links = snapshot.extract_all(self.listing.item, |item| {
            let href = item
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))?;
            let url = base.join(href.trim()).ok()?.to_string();
            let title = item
                .select(&title_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();
            (!title.is_empty()).then_some(ListingLink { title, url })
        })?;

        Ok(links
            .into_iter()
            .filter(|link| self.matches(&link.url))
            .unique_by(|link| link.url.clone())
            .collect())
    }

    /// Extract article fields from a detail page.
    ///
    /// `fallback_title` (the listing text) is used when the page has no title
    /// element. Blocklisted bodies are rejected even if every field parsed.
    pub fn parse_detail(&self, url: &str, html: &str, fallback_title: &str) -> Extraction {
        let fields = match self.read_fields(url, html, fallback_title) {
            Ok(fields) => fields,
            Err(e) => return Extraction::Failed(e),
        };
        let body = fields.body.as_deref().unwrap_or_default();
        match self.blocklisted(body) {
            Some(marker) => Extraction::Rejected(RejectReason::Blocklisted { marker }),
            None => Extraction::Accepted(fields),
        }
    }

    fn read_fields(
        &self,
        url: &str,
        html: &str,
        fallback_title: &str,
    ) -> Result<RawFields, ExtractError> {
        let snapshot = Snapshot::parse(html);
        let selectors = &self.detail;

        let title = snapshot
            .extract_one(selectors.title, non_empty_text)?
            .or_else(|| {
                let fallback = fallback_title.trim();
                (!fallback.is_empty()).then(|| fallback.to_string())
            })
            .ok_or(ExtractError::MissingTitle)?;

        let paragraphs = snapshot.extract_all(selectors.body, non_empty_text)?;
        let body = (!paragraphs.is_empty()).then(|| paragraphs.join("\n"));

        let excerpt = match selectors.excerpt {
            Some(selector) => snapshot.extract_one(selector, non_empty_text)?,
            None => None,
        }
        .or_else(|| body.as_deref().and_then(first_line));

        let author = match selectors.author {
            Some(selector) => snapshot.extract_one(selector, non_empty_text)?,
            None => None,
        };

        let img_link = match selectors.image {
            Some((selector, attr)) => snapshot
                .extract_one(selector, |el| el.value().attr(attr).map(str::to_string))?
                .and_then(|src| Url::parse(url).ok()?.join(src.trim()).ok())
                .map(|u| u.to_string()),
            None => None,
        };

        let date = self.read_date(&snapshot, url)?.map(dates::format_date);
        if date.is_none() {
            debug!(source = %self.id, %url, "No parseable publication date");
        }

        Ok(RawFields {
            title,
            body,
            excerpt,
            date,
            url: url.to_string(),
            author,
            img_link,
        })
    }

    fn read_date(
        &self,
        snapshot: &Snapshot,
        url: &str,
    ) -> Result<Option<chrono::NaiveDate>, RenderError> {
        Ok(match self.date_rule {
            DateRule::ItalianLabel { selector } => snapshot
                .extract_one(selector, non_empty_text)?
                .and_then(|text| dates::parse_italian_label(&text)),
            DateRule::IsoAttribute { selector, attr } => snapshot
                .extract_one(selector, |el| el.value().attr(attr).map(str::to_string))?
                .and_then(|value| dates::parse_iso(&value)),
            DateRule::UrlPath => dates::parse_url_path(url),
            DateRule::EnglishLabelNextDay { selector } => snapshot
                .extract_one(selector, non_empty_text)?
                .and_then(|text| dates::parse_english_label_next_day(&text)),
        })
    }

    fn blocklisted(&self, body: &str) -> Option<&'static str> {
        if self.blocklist.is_empty() {
            return None;
        }
        let body = body.to_lowercase();
        self.blocklist
            .iter()
            .copied()
            .find(|marker| body.contains(&marker.to_lowercase()))
    }

    /// Fetch and extract one article.
    ///
    /// The page is opened and closed inside [`render_html`], so nothing stays
    /// open once this returns, whatever the outcome.
    #[instrument(level = "debug", skip_all, fields(source = %self.id, url = %candidate.url))]
    pub async fn extract<E: RenderEngine>(
        &self,
        engine: &E,
        candidate: &CandidateUrl,
        timeout: Duration,
    ) -> Extraction {
        match render_html(engine, &candidate.url, timeout).await {
            Ok(html) => self.parse_detail(&candidate.url, &html, &candidate.listing_title),
            Err(e) => Extraction::Failed(e.into()),
        }
    }
}

/// A small adapter over `https://news.test/` used by pipeline tests.
#[cfg(test)]
pub(crate) fn test_adapter() -> SourceAdapter {
    use once_cell::sync::Lazy;

    static TEST_ARTICLE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^https://news\.test/[a-z0-9-]+$")
            .expect("valid test pattern")
    });

    SourceAdapter {
        id: SourceId::Wired,
        listing_url: "https://news.test/list/{page}",
        pagination_bound: 3,
        listing: ListingSelectors {
            item: "li",
            title: "a",
            link: "a",
        },
        detail: DetailSelectors {
            title: "h1",
            author: Some(".byline"),
            excerpt: None,
            body: "p",
            image: None,
        },
        article_url: &TEST_ARTICLE,
        date_rule: DateRule::IsoAttribute {
            selector: "time",
            attr: "datetime",
        },
        identity_seed: IdentitySeed::Title,
        default_author: "Test Desk",
        blocklist: &["sponsored"],
    }
}

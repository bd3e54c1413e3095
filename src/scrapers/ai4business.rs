//! AI4Business article source.
//!
//! Italian business-technology magazine. The AI section is a classic
//! WordPress archive paginated as `/page/N/`; article pages carry the date
//! as an Italian label (`12 marzo 2024`) rather than a machine-readable
//! attribute.

use super::{DateRule, DetailSelectors, IdentitySeed, ListingSelectors, SourceAdapter};
use crate::models::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https://www\.ai4business\.it/intelligenza-artificiale/[a-z0-9-]+/?$",
    )
    .expect("valid AI4Business article pattern")
});

pub fn adapter() -> SourceAdapter {
    SourceAdapter {
        id: SourceId::Ai4Business,
        listing_url: "https://www.ai4business.it/intelligenza-artificiale/page/{page}/",
        pagination_bound: 5,
        listing: ListingSelectors {
            item: "article",
            title: ".entry-title, h2, h3",
            link: ".entry-title a, h2 a, h3 a",
        },
        detail: DetailSelectors {
            title: "h1.entry-title, h1",
            author: Some(".author-name, .entry-author a"),
            excerpt: Some(".entry-summary, .article-excerpt"),
            body: ".entry-content > p",
            image: Some(("meta[property='og:image']", "content")),
        },
        article_url: &ARTICLE_URL,
        date_rule: DateRule::ItalianLabel {
            selector: ".entry-date, .post-date",
        },
        identity_seed: IdentitySeed::Title,
        default_author: "Redazione AI4Business",
        blocklist: &[],
    }
}

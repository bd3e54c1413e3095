//! Wired Italia article source.
//!
//! Topic pages list summary cards; article pages expose the publication
//! timestamp in a `<time datetime="...">` attribute.

use super::{DateRule, DetailSelectors, IdentitySeed, ListingSelectors, SourceAdapter};
use crate::models::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://www\.wired\.it/article/[a-z0-9-]+/?$")
        .expect("valid Wired article pattern")
});

pub fn adapter() -> SourceAdapter {
    SourceAdapter {
        id: SourceId::Wired,
        listing_url: "https://www.wired.it/topic/intelligenza-artificiale/page/{page}/",
        pagination_bound: 5,
        listing: ListingSelectors {
            item: ".summary-item",
            title: ".summary-item__hed",
            link: "a.summary-item__hed-link, a",
        },
        detail: DetailSelectors {
            title: "h1[data-testid='ContentHeaderHed'], h1",
            author: Some(".byline__name"),
            excerpt: Some(".content-header__dek"),
            body: ".body__inner-container p",
            image: Some(("meta[property='og:image']", "content")),
        },
        article_url: &ARTICLE_URL,
        date_rule: DateRule::IsoAttribute {
            selector: "time[datetime]",
            attr: "datetime",
        },
        identity_seed: IdentitySeed::Title,
        default_author: "Wired Italia",
        blocklist: &[],
    }
}

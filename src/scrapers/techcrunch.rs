//! TechCrunch article source.
//!
//! Article URLs embed the publication date (`/2024/01/01/slug/`), which is
//! more reliable than anything in the page body. Headlines get rewritten
//! after publication, so articles are keyed by canonical URL instead of title.

use super::{DateRule, DetailSelectors, IdentitySeed, ListingSelectors, SourceAdapter};
use crate::models::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https://techcrunch\.com/\d{4}/\d{2}/\d{2}/[a-z0-9-]+/?(?:[?#].*)?$",
    )
    .expect("valid TechCrunch article pattern")
});

pub fn adapter() -> SourceAdapter {
    SourceAdapter {
        id: SourceId::TechCrunch,
        listing_url: "https://techcrunch.com/category/artificial-intelligence/page/{page}/",
        pagination_bound: 3,
        listing: ListingSelectors {
            item: ".loop-card, .wp-block-post",
            title: ".loop-card__title, h3",
            link: "a.loop-card__title-link, h3 a",
        },
        detail: DetailSelectors {
            title: "h1.article-hero__title, h1",
            author: Some(
                ".article-hero__authors a, .wp-block-tc23-author-card-name a",
            ),
            excerpt: None,
            body: ".entry-content > p, .wp-block-post-content > p",
            image: Some(("meta[property='og:image']", "content")),
        },
        article_url: &ARTICLE_URL,
        date_rule: DateRule::UrlPath,
        identity_seed: IdentitySeed::Url,
        default_author: "TechCrunch",
        blocklist: &[],
    }
}

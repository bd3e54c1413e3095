//! AI News (artificialintelligence-news.com) article source.
//!
//! Two quirks set this source apart:
//! - its date label is one day behind the actual publication, so the parsed
//!   day is shifted forward by one;
//! - sponsored posts and event promotions share the news feed, and are
//!   rejected by body markers instead of being stored.

use super::{DateRule, DetailSelectors, IdentitySeed, ListingSelectors, SourceAdapter};
use crate::models::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https://www\.artificialintelligence-news\.com/news/[a-z0-9-]+/?$",
    )
    .expect("valid AI News article pattern")
});

const BLOCKLIST: &[&str] = &[
    "sponsored content",
    "this article is sponsored",
    "in partnership with",
    "register for the webinar",
];

pub fn adapter() -> SourceAdapter {
    SourceAdapter {
        id: SourceId::AiNews,
        listing_url: "https://www.artificialintelligence-news.com/news/page/{page}/",
        pagination_bound: 5,
        listing: ListingSelectors {
            item: "article",
            title: ".elementor-post__title, h3",
            link: ".elementor-post__title a, h3 a",
        },
        detail: DetailSelectors {
            title: "h1.elementor-heading-title, h1",
            author: Some(".elementor-post-info__item--type-author"),
            excerpt: None,
            body: ".elementor-widget-theme-post-content p",
            image: Some(("meta[property='og:image']", "content")),
        },
        article_url: &ARTICLE_URL,
        date_rule: DateRule::EnglishLabelNextDay {
            selector: ".elementor-post-info__item--type-date",
        },
        identity_seed: IdentitySeed::Title,
        default_author: "AI News",
        blocklist: BLOCKLIST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::{ExtractError, Extraction, RejectReason};

    fn page(body: &str) -> String {
        format!(
            r#"<h1 class="elementor-heading-title">Model news</h1>
               <span class="elementor-post-info__item--type-date">January 31, 2024</span>
               <div class="elementor-widget-theme-post-content">{body}</div>"#
        )
    }

    #[test]
    fn test_date_is_shifted_one_day() {
        let adapter = adapter();
        let html = page("<p>Regular reporting.</p>");
        let Extraction::Accepted(fields) = adapter.parse_detail(
            "https://www.artificialintelligence-news.com/news/model-news/",
            &html,
            "",
        ) else {
            panic!("expected an accepted article");
        };
        assert_eq!(fields.date.as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn test_sponsored_body_is_rejected() {
        let adapter = adapter();
        let html = page("<p>Intro.</p><p>Sponsored Content from a vendor.</p>");
        let outcome = adapter.parse_detail(
            "https://www.artificialintelligence-news.com/news/model-news/",
            &html,
            "",
        );
        assert!(matches!(
            outcome,
            Extraction::Rejected(RejectReason::Blocklisted {
                marker: "sponsored content"
            })
        ));
    }

    #[test]
    fn test_missing_title_everywhere_fails() {
        let adapter = adapter();
        let outcome = adapter.parse_detail(
            "https://www.artificialintelligence-news.com/news/model-news/",
            "<div class=\"elementor-widget-theme-post-content\"><p>Body.</p></div>",
            "   ",
        );
        assert!(matches!(
            outcome,
            Extraction::Failed(ExtractError::MissingTitle)
        ));

    }
}

//! Selector extraction over a rendered document.

use super::RenderError;
use scraper::{ElementRef, Html, Selector};

/// A parsed copy of a page's markup.
///
/// Built from the string an engine returns, so extraction is synchronous and
/// never holds a page open.
pub struct Snapshot {
    document: Html,
}

impl Snapshot {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Apply `map` to the first element matching `selector`.
    ///
    /// Returns `Ok(None)` when nothing matches or `map` declines the element.
    pub fn extract_one<T>(
        &self,
        selector: &str,
        map: impl FnOnce(ElementRef<'_>) -> Option<T>,
    ) -> Result<Option<T>, RenderError> {
        let selector = compile(selector)?;
        Ok(self.document.select(&selector).next().and_then(map))
    }

    /// Apply `map` to every element matching `selector`, keeping the `Some`s.
    pub fn extract_all<T>(
        &self,
        selector: &str,
        map: impl FnMut(ElementRef<'_>) -> Option<T>,
    ) -> Result<Vec<T>, RenderError> {
        let selector = compile(selector)?;
        Ok(self.document.select(&selector).filter_map(map).collect())
    }
}

pub(crate) fn compile(selector: &str) -> Result<Selector, RenderError> {
    Selector::parse(selector).map_err(|e| RenderError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Visible text of an element with runs of whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`element_text`], but `None` for elements with no visible text.
pub fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    let text = element_text(element);
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h1 class="title">  Hello
             world </h1>
          <ul>
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
            <li><a>no href</a></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_extract_one_collapses_whitespace() {
        let snapshot = Snapshot::parse(PAGE);
        let title = snapshot.extract_one("h1.title", non_empty_text).unwrap();
        assert_eq!(title.as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_extract_one_missing_is_none() {
        let snapshot = Snapshot::parse(PAGE);
        let missing = snapshot.extract_one(".nope", non_empty_text).unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_extract_all_filters_declined_elements() {
        let snapshot = Snapshot::parse(PAGE);
        let hrefs = snapshot
            .extract_all("li a", |a| a.value().attr("href").map(str::to_string))
            .unwrap();
        assert_eq!(hrefs, vec!["/a", "/b"]);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let snapshot = Snapshot::parse(PAGE);
        let err = snapshot.extract_all("li[[", non_empty_text).unwrap_err();
        assert!(matches!(err, RenderError::Selector { .. }));
    }
}

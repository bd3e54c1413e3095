//! Page rendering engines.
//!
//! The pipeline only ever asks an engine for three things: open a fresh page,
//! navigate it to a URL and hand back the resulting markup, then close it.
//! Selector work happens afterwards on an owned [`Snapshot`], so the engine
//! never has to know what a source adapter is looking for.
//!
//! # Engines
//!
//! | Engine | Module | When to use |
//! |--------|--------|-------------|
//! | Headless Chrome | [`chrome`] | Sources that build their markup with JavaScript |
//! | Plain HTTP | [`http`] | Static markup; much cheaper, no browser process |

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub mod chrome;
pub mod http;
pub mod snapshot;

pub use chrome::{ChromeEngine, ChromeOptions};
pub use http::HttpEngine;
pub use snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch render engine: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("navigation to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
    #[error("render engine error: {0}")]
    Protocol(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Which engine a run should launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Chrome,
    Http,
}

/// A launched engine. The top-level handle is shared by every worker lane;
/// each lane opens its own page.
pub trait RenderEngine {
    type Page: RenderPage;

    async fn open_page(&self) -> Result<Self::Page, RenderError>;

    /// Release the engine. Called exactly once, at the end of a run.
    async fn shutdown(self) -> Result<(), RenderError>
    where
        Self: Sized;
}

/// A single page owned by one lane for the duration of one fetch.
pub trait RenderPage {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// The current document markup.
    async fn content(&self) -> Result<String, RenderError>;

    async fn close(self) -> Result<(), RenderError>
    where
        Self: Sized;
}

/// Open a page, load `url` and return its markup.
///
/// The page is closed on every path, including navigation failures and
/// timeouts. A close failure is logged but never masks the load result.
pub async fn render_html<E: RenderEngine>(
    engine: &E,
    url: &str,
    timeout: Duration,
) -> Result<String, RenderError> {
    let mut page = engine.open_page().await?;

    let result = match tokio::time::timeout(timeout, load(&mut page, url)).await {
        Ok(loaded) => loaded,
        Err(_) => Err(RenderError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        }),
    };

    if let Err(e) = page.close().await {
        warn!(%url, error = %e, "Failed to close page");
    }
    result
}

async fn load<P: RenderPage>(page: &mut P, url: &str) -> Result<String, RenderError> {
    page.navigate(url).await?;
    page.content().await
}

#[cfg(test)]
pub(crate) mod fake {
    //! A render engine serving canned markup, for pipeline tests.

    use super::{RenderEngine, RenderError, RenderPage};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    pub struct FakeState {
        pub opened: AtomicUsize,
        pub closed: AtomicUsize,
        pub shut_down: AtomicBool,
        pub visits: Mutex<Vec<String>>,
    }

    #[derive(Debug, Default, Clone)]
    pub struct FakeEngine {
        pages: Arc<HashMap<String, String>>,
        pub state: Arc<FakeState>,
    }

    impl FakeEngine {
        pub fn new(pages: impl IntoIterator<Item = (String, String)>) -> Self {
            Self {
                pages: Arc::new(pages.into_iter().collect()),
                state: Arc::default(),
            }
        }
    }

    pub struct FakePage {
        pages: Arc<HashMap<String, String>>,
        state: Arc<FakeState>,
        current: Option<String>,
    }

    impl RenderEngine for FakeEngine {
        type Page = FakePage;

        async fn open_page(&self) -> Result<FakePage, RenderError> {
            self.state.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakePage {
                pages: Arc::clone(&self.pages),
                state: Arc::clone(&self.state),
                current: None,
            })
        }

        async fn shutdown(self) -> Result<(), RenderError> {
            self.state.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    impl RenderPage for FakePage {
        async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
            self.state.visits.lock().push(url.to_string());
            tokio::task::yield_now().await;
            match self.pages.get(url) {
                Some(html) => {
                    self.current = Some(html.clone());
                    Ok(())
                }
                None => Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: "404".to_string(),
                }),
            }
        }

        async fn content(&self) -> Result<String, RenderError> {
            self.current
                .clone()
                .ok_or_else(|| RenderError::Protocol("no document loaded".to_string()))
        }

        async fn close(self) -> Result<(), RenderError> {
            self.state.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeEngine;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_render_html_returns_markup_and_closes_page() {
        let engine = FakeEngine::new([("https://a.test/".to_string(), "<p>hi</p>".to_string())]);

        let html = render_html(&engine, "https://a.test/", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(html, "<p>hi</p>");
        assert_eq!(engine.state.opened.load(Ordering::SeqCst), 1);
        assert_eq!(engine.state.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_html_closes_page_on_failure() {
        let engine = FakeEngine::new([]);

        let err = render_html(&engine, "https://missing.test/", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Navigation { .. }));
        assert_eq!(engine.state.closed.load(Ordering::SeqCst), 1);
    }

    struct SlowEngine;
    struct SlowPage;

    impl RenderEngine for SlowEngine {
        type Page = SlowPage;

        async fn open_page(&self) -> Result<SlowPage, RenderError> {
            Ok(SlowPage)
        }

        async fn shutdown(self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    impl RenderPage for SlowPage {
        async fn navigate(&mut self, _url: &str) -> Result<(), RenderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn content(&self) -> Result<String, RenderError> {
            Ok(String::new())
        }

        async fn close(self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_navigation_degrades_to_timeout() {
        let err = render_html(&SlowEngine, "https://slow.test/", Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout { secs: 10, .. }));
    }
}

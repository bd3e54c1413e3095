//! Headless Chrome engine backed by chromiumoxide.
//!
//! One browser process is launched per run. The CDP event handler runs on
//! its own task and is aborted when the engine shuts down; every fetch uses
//! a fresh tab that is closed before the lane moves on.

use super::{RenderEngine, RenderError, RenderPage};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Launch options for [`ChromeEngine`].
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// Explicit Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    /// Upper bound for a single CDP request.
    pub request_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            executable: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

pub struct ChromeEngine {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeEngine {
    #[instrument(level = "info", skip_all)]
    pub async fn launch(options: &ChromeOptions) -> Result<Self, RenderError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(options.request_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        info!("Headless browser launched");
        Ok(Self { browser, handler })
    }
}

pub struct ChromePage {
    page: Page,
}

impl RenderEngine for ChromeEngine {
    type Page = ChromePage;

    async fn open_page(&self) -> Result<ChromePage, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Protocol(e.to_string()))?;
        Ok(ChromePage { page })
    }

    #[instrument(level = "info", skip_all)]
    async fn shutdown(mut self) -> Result<(), RenderError> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        info!("Headless browser closed");
        closed
            .map(|_| ())
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }
}

impl RenderPage for ChromePage {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn content(&self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }

    async fn close(self) -> Result<(), RenderError> {
        self.page
            .close()
            .await
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }
}

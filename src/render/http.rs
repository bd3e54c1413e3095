//! Plain HTTP engine for sources that serve complete markup.
//!
//! A "page" here is just the last fetched body; opening and closing one
//! costs nothing, which keeps the lane code identical across engines.

use super::{RenderEngine, RenderError, RenderPage};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
}

impl HttpEngine {
    pub fn new(request_timeout: Duration) -> Result<Self, RenderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[derive(Debug)]
pub struct HttpPage {
    client: Client,
    body: Option<String>,
}

impl RenderEngine for HttpEngine {
    type Page = HttpPage;

    async fn open_page(&self) -> Result<HttpPage, RenderError> {
        Ok(HttpPage {
            client: self.client.clone(),
            body: None,
        })
    }

    async fn shutdown(self) -> Result<(), RenderError> {
        Ok(())
    }
}

impl RenderPage for HttpPage {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        let body = response.text().await?;
        debug!(%url, bytes = body.len(), "Fetched page");
        self.body = Some(body);
        Ok(())
    }

    async fn content(&self) -> Result<String, RenderError> {
        match &self.body {
            Some(body) => Ok(body.clone()),
            None => Err(RenderError::Protocol("page has not been navigated".into())),
        }
    }

    async fn close(self) -> Result<(), RenderError> {
        Ok(())
    }
}

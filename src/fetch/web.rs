//! HTTP-backed [`ContentFetcher`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::page::{html_to_text, is_textual};
use super::search::SerperClient;
use super::{ContentFetcher, SearchHit, is_fetchable_url};
use crate::config::{FetchConfig, SearchConfig};
use crate::constants::network::CONNECTION_TIMEOUT_SECS;
use crate::types::{QuillError, Result};

/// Serper search plus plain HTTP page retrieval
#[derive(Debug)]
pub struct WebFetcher {
    search: SerperClient,
    client: reqwest::Client,
}

impl WebFetcher {
    pub fn new(search: &SearchConfig, fetch: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .user_agent(fetch.user_agent.as_str())
            .build()
            .map_err(|e| QuillError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            search: SerperClient::new(search)?,
            client,
        })
    }
}

#[async_trait]
impl ContentFetcher for WebFetcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.search.search(query, max_results).await
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        if !is_fetchable_url(url) {
            return Err(QuillError::fetch(url, "not a fetchable web page"));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QuillError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuillError::fetch(url, format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_textual(&content_type) {
            return Err(QuillError::fetch(
                url,
                format!("unsupported content type {}", content_type),
            ));
        }

        let body = response.text().await.map_err(|e| QuillError::fetch(url, e))?;
        debug!(url, bytes = body.len(), "Fetched page");

        if content_type.starts_with("text/plain") {
            Ok(body)
        } else {
            Ok(html_to_text(&body))
        }
    }
}

//! Serper web search client

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SearchHit;
use crate::config::SearchConfig;
use crate::constants::network::CONNECTION_TIMEOUT_SECS;
use crate::types::{QuillError, Result};

pub struct SerperClient {
    /// Never exposed in logs or debug output
    api_key: SecretString,
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SerperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperClient")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SerperClient {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("SERPER_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                QuillError::Config(
                    "Search API key not found. Set SERPER_API_KEY env var or search.api_key in config"
                        .to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| QuillError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoint: format!("{}/search", config.api_base.trim_end_matches('/')),
            client,
        })
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        debug!(query, max_results, "Web search");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", self.api_key.expose_secret())
            .json(&SearchRequest {
                q: query,
                num: max_results,
            })
            .send()
            .await
            .map_err(|e| QuillError::fetch(query, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuillError::fetch(
                query,
                format!("search API returned {}: {}", status, body.trim()),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| QuillError::fetch(query, format!("invalid search response: {}", e)))?;

        Ok(into_hits(body, max_results))
    }
}

fn into_hits(response: SearchResponse, max_results: usize) -> Vec<SearchHit> {
    response
        .organic
        .into_iter()
        .filter(|r| !r.link.trim().is_empty())
        .take(max_results)
        .map(|r| SearchHit {
            title: r.title,
            url: r.link,
            snippet: r.snippet,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organic_results() {
        let raw = r#"{
            "searchParameters": {"q": "tokio"},
            "organic": [
                {"title": "Tokio", "link": "https://tokio.rs", "snippet": "An async runtime", "position": 1},
                {"title": "No link", "snippet": "dropped"},
                {"title": "Docs", "link": "https://docs.rs/tokio"}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let hits = into_hits(response, 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://tokio.rs");
        assert_eq!(hits[0].snippet, "An async runtime");
        assert_eq!(hits[1].title, "Docs");
        assert!(hits[1].snippet.is_empty());
    }

    #[test]
    fn test_missing_organic_is_empty() {
        let response: SearchResponse = serde_json::from_str(r#"{"answerBox": {}}"#).unwrap();
        assert!(into_hits(response, 5).is_empty());
    }

    #[test]
    fn test_respects_max_results() {
        let organic = (0..8)
            .map(|i| OrganicResult {
                title: format!("r{}", i),
                link: format!("https://r{}.example", i),
                snippet: String::new(),
            })
            .collect();
        assert_eq!(into_hits(SearchResponse { organic }, 3).len(), 3);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = SearchConfig {
            api_key: Some("serper-secret".to_string()),
            api_base: "https://search.example/".to_string(),
            ..SearchConfig::default()
        };
        let client = SerperClient::new(&config).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("serper-secret"));
        assert!(debug.contains("https://search.example/search"));
    }
}

//! Web Content Access
//!
//! Search and page retrieval behind the [`ContentFetcher`] trait, plus the text
//! cleaning applied to fetched pages.

pub mod clean;
mod page;
mod search;
mod web;

pub use clean::{clean_content, is_fetchable_url};
pub use web::WebFetcher;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Result;

/// One organic search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// Page text with markup reduced; errors mean "no content"
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

pub type SharedFetcher = Arc<dyn ContentFetcher>;

//! Content Augmentation
//!
//! Optional phase: fetches full page content for research findings and returns
//! a copy of the notes with `scraped_content` filled in. The input notes are
//! never modified.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::FetchConfig;
use crate::constants::fetch::MAX_PAGE_CHARS;
use crate::fetch::SharedFetcher;
use crate::fetch::clean::{is_fetchable_url, usable_content};
use crate::types::{QuillError, ResearchNotes, Result};

/// Fetch statistics for one augmentation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AugmentStats {
    pub total_findings: usize,
    pub scraped_findings: usize,
    pub urls_attempted: usize,
    pub urls_with_content: usize,
}

impl AugmentStats {
    /// Finding totals of already augmented notes; URL counters stay zero
    pub fn from_notes(notes: &ResearchNotes) -> Self {
        Self {
            total_findings: notes.finding_count(),
            scraped_findings: notes.scraped_count(),
            ..Default::default()
        }
    }

    /// Share of findings that received content, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_findings == 0 {
            0.0
        } else {
            self.scraped_findings as f64 * 100.0 / self.total_findings as f64
        }
    }
}

impl std::fmt::Display for AugmentStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} findings enriched ({:.1}%)",
            self.scraped_findings,
            self.total_findings,
            self.success_rate()
        )
    }
}

#[derive(Debug, Clone)]
pub struct AugmentResult {
    pub notes: ResearchNotes,
    pub stats: AugmentStats,
}

pub struct ContentAugmenter {
    fetcher: SharedFetcher,
    concurrency: usize,
    min_content_chars: usize,
}

impl ContentAugmenter {
    pub fn new(fetcher: SharedFetcher, config: &FetchConfig) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1),
            min_content_chars: config.min_content_chars,
        }
    }

    /// Fails with `EmptyOutcome` when no page yields usable content
    #[instrument(skip_all, fields(sections = notes.sections.len()))]
    pub async fn augment(&self, notes: &ResearchNotes) -> Result<AugmentResult> {
        let urls: Vec<String> = notes
            .source_urls()
            .into_iter()
            .filter(|url| is_fetchable_url(url))
            .collect();

        if urls.is_empty() {
            return Err(QuillError::EmptyOutcome {
                phase: "augment".to_string(),
                reason: "no fetchable URLs in research findings".to_string(),
            });
        }

        info!("Fetching {} pages", urls.len());
        let urls_attempted = urls.len();

        let pages: HashMap<String, String> = stream::iter(urls)
            .map(|url| async move {
                let content = match self.fetcher.fetch_page(&url).await {
                    Ok(raw) => usable_content(&raw, self.min_content_chars, MAX_PAGE_CHARS),
                    Err(e) => {
                        debug!(url = %url, "Fetch failed: {}", e);
                        None
                    }
                };
                (url, content)
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|(url, content)| async move { content.map(|c| (url, c)) })
            .collect()
            .await;

        if pages.is_empty() {
            return Err(QuillError::EmptyOutcome {
                phase: "augment".to_string(),
                reason: format!("none of {} pages yielded content", urls_attempted),
            });
        }

        let mut augmented = notes.clone();
        for finding in augmented
            .sections
            .iter_mut()
            .flat_map(|record| record.findings.iter_mut())
        {
            if let Some(content) = finding
                .source_url
                .as_deref()
                .and_then(|url| pages.get(url))
            {
                finding.scraped_content = Some(content.clone());
            }
        }

        let stats = AugmentStats {
            urls_attempted,
            urls_with_content: pages.len(),
            ..AugmentStats::from_notes(&augmented)
        };

        info!("Augmentation: {}", stats);
        Ok(AugmentResult {
            notes: augmented,
            stats,
        })
    }
}

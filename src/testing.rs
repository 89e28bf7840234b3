//! Scripted collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::ai::generator::{Generator, RecoveredQueries};
use crate::config::PipelineConfig;
use crate::fetch::{ContentFetcher, SearchHit};
use crate::types::{
    ArticleBrief, ArticlePlan, ArticleRequest, ErrorCategory, FinalArticle, QuillError,
    ResearchNotes, Result, SectionFinding, SectionId, SectionPlan, SectionResearchRecord,
    SynthesizedArticle, SynthesizedSection,
};
use crate::workflow::{StatusEvent, StatusReporter};

const RECOVERED_QUERY_MARKER: &str = "[recovered]";

pub fn request() -> ArticleRequest {
    ArticleRequest::new("Async Rust in Practice", "A field guide to async Rust")
        .with_target_words(1200)
}

pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        max_retries: 3,
        retry_min_delay_ms: 0,
        retry_max_delay_ms: 0,
        ..PipelineConfig::default()
    }
}

pub fn sample_plan(sections: usize) -> ArticlePlan {
    ArticlePlan {
        brief: ArticleBrief {
            topic: "Async Rust".to_string(),
            keywords: vec!["tokio".to_string(), "futures".to_string()],
            target_audience: Some("backend engineers".to_string()),
            tone: "informative".to_string(),
            desired_length_words: 1200,
        },
        sections: (1..=sections as u32)
            .map(|id| SectionPlan {
                section_id: SectionId(id),
                title: format!("Section {}", id),
                key_points: vec![format!("point {}", id)],
                research_queries: Some(vec![format!("query {}", id)]),
            })
            .collect(),
    }
}

fn finding(id: u32) -> SectionFinding {
    SectionFinding {
        source_url: Some(format!("https://example.com/{}", id)),
        snippet: format!("snippet for section {}", id),
        scraped_content: None,
        relevance_score: None,
    }
}

/// Successful research for every section of a plan
pub fn research_for(plan: &ArticlePlan) -> ResearchNotes {
    ResearchNotes {
        sections: plan
            .sections
            .iter()
            .map(|s| SectionResearchRecord {
                section_id: s.section_id,
                findings: vec![finding(s.section_id.get())],
                summary: format!("summary {}", s.section_id),
                attempts: 1,
                recovered: false,
                failure: None,
            })
            .collect(),
    }
}

/// One section per URL, one finding each
pub fn notes_with_urls(urls: &[&str]) -> ResearchNotes {
    ResearchNotes {
        sections: urls
            .iter()
            .enumerate()
            .map(|(i, url)| SectionResearchRecord {
                section_id: SectionId(i as u32 + 1),
                findings: vec![SectionFinding {
                    source_url: Some(url.to_string()),
                    snippet: "snippet".to_string(),
                    scraped_content: None,
                    relevance_score: None,
                }],
                summary: "summary".to_string(),
                attempts: 1,
                recovered: false,
                failure: None,
            })
            .collect(),
    }
}

fn scripted_failure(what: &str) -> QuillError {
    QuillError::llm(ErrorCategory::Transient, format!("scripted failure: {}", what))
}

// =============================================================================
// Generator
// =============================================================================

#[derive(Default)]
pub struct ScriptedGenerator {
    plan: Option<ArticlePlan>,
    /// Failures before success per section; `u32::MAX` never succeeds
    research_failures: HashMap<u32, u32>,
    empty_findings: HashSet<u32>,
    research_delays: HashMap<u32, Duration>,
    /// `None` makes recovery itself fail
    recovery: Option<Vec<String>>,
    recovery_fixes: bool,
    synthesis_failures: HashSet<u32>,
    synthesis_delays: HashMap<u32, Duration>,
    wrong_ids: bool,
    fail_finalize: bool,
    fail_enhance: bool,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedGenerator {
    pub fn new(plan: ArticlePlan) -> Self {
        Self {
            plan: Some(plan),
            recovery: Some(vec!["alternative query".to_string()]),
            ..Default::default()
        }
    }

    pub fn failing_plan() -> Self {
        Self::default()
    }

    pub fn always_fail_research(mut self, id: u32) -> Self {
        self.research_failures.insert(id, u32::MAX);
        self
    }

    pub fn flaky_research(mut self, id: u32, failures: u32) -> Self {
        self.research_failures.insert(id, failures);
        self
    }

    pub fn empty_findings(mut self, id: u32) -> Self {
        self.empty_findings.insert(id);
        self
    }

    pub fn research_delay(mut self, id: u32, delay: Duration) -> Self {
        self.research_delays.insert(id, delay);
        self
    }

    pub fn recovery_queries(mut self, queries: &[&str]) -> Self {
        self.recovery = Some(queries.iter().map(|q| q.to_string()).collect());
        self
    }

    pub fn without_recovery(mut self) -> Self {
        self.recovery = None;
        self
    }

    /// Attempts using recovered queries succeed
    pub fn recovery_fixes(mut self) -> Self {
        self.recovery_fixes = true;
        self
    }

    pub fn fail_synthesis(mut self, id: u32) -> Self {
        self.synthesis_failures.insert(id);
        self
    }

    pub fn synthesis_delay(mut self, id: u32, delay: Duration) -> Self {
        self.synthesis_delays.insert(id, delay);
        self
    }

    /// Return records keyed with ids that differ from the plan
    pub fn wrong_record_ids(mut self) -> Self {
        self.wrong_ids = true;
        self
    }

    pub fn fail_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    pub fn fail_enhance(mut self) -> Self {
        self.fail_enhance = true;
        self
    }

    /// Number of calls recorded under a key such as `plan` or `research:3`
    pub fn calls(&self, key: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn record_call(&self, key: String) -> u32 {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    fn reported_id(&self, id: SectionId) -> SectionId {
        if self.wrong_ids {
            SectionId(id.get() + 100)
        } else {
            id
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn plan(&self, _request: &ArticleRequest) -> Result<ArticlePlan> {
        self.record_call("plan".to_string());
        self.plan.clone().ok_or_else(|| scripted_failure("plan"))
    }

    async fn research_section(
        &self,
        _request: &ArticleRequest,
        section: &SectionPlan,
    ) -> Result<SectionResearchRecord> {
        let id = section.section_id.get();
        let attempt = self.record_call(format!("research:{}", id));
        if let Some(delay) = self.research_delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }

        let recovered = section
            .queries()
            .iter()
            .any(|q| q.starts_with(RECOVERED_QUERY_MARKER));
        let failures = self.research_failures.get(&id).copied().unwrap_or(0);
        if attempt <= failures && !(recovered && self.recovery_fixes) {
            return Err(scripted_failure(&format!("research {}", id)));
        }

        let findings = if self.empty_findings.contains(&id) {
            vec![]
        } else {
            vec![finding(id)]
        };
        Ok(SectionResearchRecord {
            section_id: self.reported_id(section.section_id),
            findings,
            summary: format!("summary {}", id),
            attempts: 0,
            recovered: false,
            failure: None,
        })
    }

    async fn recover_section(
        &self,
        _request: &ArticleRequest,
        section: &SectionPlan,
        _failure: &str,
    ) -> Result<RecoveredQueries> {
        self.record_call(format!("recover:{}", section.section_id));
        let queries = self
            .recovery
            .clone()
            .ok_or_else(|| scripted_failure("recovery"))?;
        Ok(RecoveredQueries {
            research_queries: queries
                .into_iter()
                .map(|q| format!("{} {}", RECOVERED_QUERY_MARKER, q))
                .collect(),
            rationale: "broaden the search".to_string(),
        })
    }

    async fn synthesize_section(
        &self,
        _request: &ArticleRequest,
        section: &SectionPlan,
        _research: &SectionResearchRecord,
    ) -> Result<SynthesizedSection> {
        let id = section.section_id.get();
        self.record_call(format!("synthesize:{}", id));
        if let Some(delay) = self.synthesis_delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.synthesis_failures.contains(&id) {
            return Err(scripted_failure(&format!("synthesize {}", id)));
        }
        Ok(SynthesizedSection {
            section_id: self.reported_id(section.section_id),
            title: section.title.clone(),
            content: format!("Body of section {}", id),
        })
    }

    async fn finalize(
        &self,
        request: &ArticleRequest,
        article: &SynthesizedArticle,
        sources: &[String],
    ) -> Result<FinalArticle> {
        self.record_call("finalize".to_string());
        if self.fail_finalize {
            return Err(scripted_failure("finalize"));
        }
        Ok(FinalArticle {
            title: request.title.clone(),
            meta_description: request.description.clone(),
            meta_keywords: vec![],
            image_description: String::new(),
            table_of_contents: article.sections.iter().map(|s| s.title.clone()).collect(),
            tldr: "Short version".to_string(),
            article_body: article.full_text.clone(),
            conclusion: "Wrap up".to_string(),
            references: sources.to_vec(),
            full_text_markdown: String::new(),
            enhanced: false,
        })
    }

    async fn enhance(
        &self,
        _request: &ArticleRequest,
        article: &FinalArticle,
    ) -> Result<FinalArticle> {
        self.record_call("enhance".to_string());
        if self.fail_enhance {
            return Err(scripted_failure("enhance"));
        }
        let mut enhanced = article.clone();
        enhanced.article_body = format!("{}\n\nPolished.", article.article_body);
        Ok(enhanced)
    }
}

// =============================================================================
// Fetcher
// =============================================================================

#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, String>,
    default_page: Option<String>,
    fail_all: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves a long page for every URL
    pub fn serving_sample_pages() -> Self {
        Self {
            default_page: Some("Sample page content with enough text. ".repeat(10)),
            ..Default::default()
        }
    }

    pub fn page(mut self, url: &str, content: &str) -> Self {
        self.pages.insert(url.to_string(), content.to_string());
        self
    }

    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        if self.fail_all {
            return Err(QuillError::fetch(query, "scripted search failure"));
        }
        Ok((1..=max_results.min(2))
            .map(|i| SearchHit {
                title: format!("{} result {}", query, i),
                url: format!("https://search.example/{}", i),
                snippet: format!("snippet {}", i),
            })
            .collect())
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail_all {
            return Err(QuillError::fetch(url, "scripted fetch failure"));
        }
        self.pages
            .get(url)
            .or(self.default_page.as_ref())
            .cloned()
            .ok_or_else(|| QuillError::fetch(url, "404"))
    }
}

// =============================================================================
// Reporter
// =============================================================================

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&self, event: &StatusEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

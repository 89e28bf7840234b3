//! LLM-backed generator
//!
//! Every phase is one structured model call, except research which first fans
//! out web searches for the section's queries and then asks the model to
//! digest the hits.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::prompts::{self, Prompt};
use super::{Generator, RecoveredQueries};
use crate::ai::json::from_value;
use crate::ai::provider::SharedProvider;
use crate::ai::timeout::with_timeout;
use crate::constants::{generation, research, search};
use crate::fetch::{SearchHit, SharedFetcher};
use crate::types::{
    ArticlePlan, ArticleRequest, FinalArticle, QuillError, Result, SectionFinding, SectionPlan,
    SectionResearchRecord, SynthesizedArticle, SynthesizedSection,
};

#[derive(Debug, Deserialize)]
struct ResearchDigest {
    summary: String,
    #[serde(default)]
    relevance: Vec<Relevance>,
}

#[derive(Debug, Deserialize)]
struct Relevance {
    url: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct SectionDraft {
    #[serde(default)]
    title: String,
    content: String,
}

pub struct LlmGenerator {
    provider: SharedProvider,
    fetcher: SharedFetcher,
    results_per_query: usize,
    call_timeout: Duration,
}

impl LlmGenerator {
    pub fn new(provider: SharedProvider, fetcher: SharedFetcher) -> Self {
        Self {
            provider,
            fetcher,
            results_per_query: search::DEFAULT_RESULTS_PER_QUERY,
            call_timeout: Duration::from_secs(generation::CALL_TIMEOUT_SECS),
        }
    }

    pub fn with_results_per_query(mut self, results: usize) -> Self {
        self.results_per_query = results.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// One structured model call, deserialized into `T`
    async fn call<T: DeserializeOwned>(&self, what: &str, prompt: Prompt) -> Result<T> {
        let response = with_timeout(
            self.call_timeout,
            self.provider
                .generate(prompt.system, &prompt.user, &prompt.schema),
            what,
        )
        .await?;
        debug!(
            call = what,
            model = %response.model,
            tokens = response.usage.total(),
            elapsed_ms = response.elapsed.as_millis() as u64,
            "Model call complete"
        );
        from_value(response.content, what)
    }

    /// Search every query; fails only when every search fails
    async fn search_all(&self, queries: &[&str]) -> Result<Vec<SearchHit>> {
        let outcomes = join_all(
            queries
                .iter()
                .map(|query| self.fetcher.search(query, self.results_per_query)),
        )
        .await;

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        let mut first_error = None;
        let mut failures = 0;

        for (query, outcome) in queries.iter().zip(outcomes) {
            match outcome {
                Ok(found) => hits.extend(found.into_iter().filter(|hit| seen.insert(hit.url.clone()))),
                Err(e) => {
                    warn!(query = %query, "Search failed: {}", e);
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if failures == queries.len() => Err(e),
            _ => Ok(hits),
        }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    fn name(&self) -> &str {
        self.provider.name()
    }

    #[instrument(skip_all, fields(title = %request.title))]
    async fn plan(&self, request: &ArticleRequest) -> Result<ArticlePlan> {
        self.call("plan", prompts::plan(request)).await
    }

    #[instrument(skip_all, fields(section = %section.section_id))]
    async fn research_section(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
    ) -> Result<SectionResearchRecord> {
        let queries = section.queries();
        if queries.is_empty() {
            return Ok(SectionResearchRecord {
                section_id: section.section_id,
                findings: Vec::new(),
                summary: research::NO_QUERIES_SUMMARY.to_string(),
                attempts: 0,
                recovered: false,
                failure: None,
            });
        }

        let hits = with_timeout(self.call_timeout, self.search_all(&queries), "search").await?;
        if hits.is_empty() {
            debug!("No search results");
            return Ok(SectionResearchRecord {
                section_id: section.section_id,
                findings: Vec::new(),
                summary: format!("No search results for {} queries", queries.len()),
                attempts: 0,
                recovered: false,
                failure: None,
            });
        }

        let digest: ResearchDigest = self
            .call("research", prompts::research_digest(request, section, &hits))
            .await?;

        let findings = hits
            .into_iter()
            .map(|hit| {
                let relevance_score = digest
                    .relevance
                    .iter()
                    .find(|r| r.url == hit.url)
                    .map(|r| r.score.clamp(0.0, 1.0));
                SectionFinding {
                    source_url: Some(hit.url),
                    snippet: hit.snippet,
                    scraped_content: None,
                    relevance_score,
                }
            })
            .collect();

        Ok(SectionResearchRecord {
            section_id: section.section_id,
            findings,
            summary: digest.summary,
            attempts: 0,
            recovered: false,
            failure: None,
        })
    }

    #[instrument(skip_all, fields(section = %section.section_id))]
    async fn recover_section(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
        failure: &str,
    ) -> Result<RecoveredQueries> {
        self.call("recover", prompts::recover(request, section, failure))
            .await
    }

    #[instrument(skip_all, fields(section = %section.section_id))]
    async fn synthesize_section(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
        research: &SectionResearchRecord,
    ) -> Result<SynthesizedSection> {
        let draft: SectionDraft = self
            .call(
                "synthesize",
                prompts::synthesize_section(request, section, research),
            )
            .await?;

        if draft.content.trim().is_empty() {
            return Err(QuillError::EmptyOutcome {
                phase: "synthesize".to_string(),
                reason: format!("empty content for section {}", section.section_id),
            });
        }

        Ok(SynthesizedSection {
            section_id: section.section_id,
            title: if draft.title.trim().is_empty() {
                section.title.clone()
            } else {
                draft.title
            },
            content: draft.content,
        })
    }

    #[instrument(skip_all)]
    async fn finalize(
        &self,
        request: &ArticleRequest,
        article: &SynthesizedArticle,
        sources: &[String],
    ) -> Result<FinalArticle> {
        let mut article: FinalArticle = self
            .call("finalize", prompts::finalize(request, article, sources))
            .await?;
        if article.references.is_empty() {
            article.references = sources.to_vec();
        }
        article.full_text_markdown.clear();
        Ok(article)
    }

    #[instrument(skip_all)]
    async fn enhance(
        &self,
        request: &ArticleRequest,
        article: &FinalArticle,
    ) -> Result<FinalArticle> {
        let mut enhanced: FinalArticle = self
            .call("enhance", prompts::enhance(request, article))
            .await?;
        if enhanced.references.is_empty() {
            enhanced.references = article.references.clone();
        }
        if enhanced.table_of_contents.is_empty() {
            enhanced.table_of_contents = article.table_of_contents.clone();
        }
        Ok(enhanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{LlmProvider, LlmResponse};
    use crate::testing::ScriptedFetcher;
    use crate::types::{ErrorCategory, SectionId};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    /// Replays canned responses in order and records prompts
    #[derive(Default)]
    struct CannedProvider {
        responses: Mutex<Vec<Value>>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedProvider {
        fn new(responses: Vec<Value>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                prompts: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate(&self, _system: &str, prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .map(LlmResponse::content_only)
                .ok_or_else(|| QuillError::llm(ErrorCategory::Unavailable, "no canned response"))
        }
        fn name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-1"
        }
    }

    fn generator(responses: Vec<Value>, fetcher: ScriptedFetcher) -> (Arc<CannedProvider>, LlmGenerator) {
        let provider = Arc::new(CannedProvider::new(responses));
        let generator = LlmGenerator::new(provider.clone(), Arc::new(fetcher)).with_results_per_query(2);
        (provider, generator)
    }

    fn section(queries: Option<Vec<&str>>) -> SectionPlan {
        SectionPlan {
            section_id: SectionId(4),
            title: "Pinning".to_string(),
            key_points: vec!["Pin<&mut T>".to_string()],
            research_queries: queries.map(|q| q.into_iter().map(String::from).collect()),
        }
    }

    fn request() -> ArticleRequest {
        ArticleRequest::new("Async Rust", "A guide")
    }

    #[tokio::test]
    async fn test_plan_accepts_string_section_ids() {
        let (_, generator) = generator(
            vec![json!({
                "brief": {"topic": "Async Rust"},
                "sections": [
                    {"section_id": "1", "title": "Intro", "key_points": [], "research_queries": ["q"]},
                    {"section_id": 2, "title": "Body", "key_points": ["k"], "research_queries": null}
                ]
            })],
            ScriptedFetcher::new(),
        );

        let plan = generator.plan(&request()).await.unwrap();
        assert_eq!(plan.section_ids(), vec![SectionId(1), SectionId(2)]);
        assert_eq!(plan.brief.tone, "informative");
    }

    #[tokio::test]
    async fn test_malformed_plan_is_parse_error() {
        let (_, generator) = generator(vec![json!({"outline": []})], ScriptedFetcher::new());
        let err = generator.plan(&request()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_research_without_queries_skips_search_and_model() {
        let (provider, generator) = generator(vec![], ScriptedFetcher::new().fail_all());

        let record = generator
            .research_section(&request(), &section(None))
            .await
            .unwrap();

        assert!(record.findings.is_empty());
        assert_eq!(record.summary, research::NO_QUERIES_SUMMARY);
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_research_builds_findings_from_hits() {
        let (provider, generator) = generator(
            vec![json!({
                "summary": "Pinning keeps futures in place",
                "relevance": [{"url": "https://search.example/1", "score": 1.7}]
            })],
            ScriptedFetcher::new(),
        );

        let record = generator
            .research_section(&request(), &section(Some(vec!["pin", "unpin"])))
            .await
            .unwrap();

        // Both queries return the same two URLs; duplicates are dropped
        assert_eq!(record.findings.len(), 2);
        assert_eq!(record.findings[0].relevance_score, Some(1.0));
        assert_eq!(record.findings[1].relevance_score, None);
        assert_eq!(record.summary, "Pinning keeps futures in place");
        assert!(provider.prompts.lock().unwrap()[0].contains("Search Results"));
    }

    #[tokio::test]
    async fn test_research_fails_when_every_search_fails() {
        let (_, generator) = generator(vec![], ScriptedFetcher::new().fail_all());
        let err = generator
            .research_section(&request(), &section(Some(vec!["pin"])))
            .await
            .unwrap_err();
        assert!(matches!(err, QuillError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_synthesis_keeps_planned_id_and_title_fallback() {
        let (_, generator) = generator(
            vec![json!({"content": "## Pinning\n\nBody"})],
            ScriptedFetcher::new(),
        );
        let research = SectionResearchRecord::failed(SectionId(4), 4, "search down");

        let synthesized = generator
            .synthesize_section(&request(), &section(None), &research)
            .await
            .unwrap();

        assert_eq!(synthesized.section_id, SectionId(4));
        assert_eq!(synthesized.title, "Pinning");
    }

    #[tokio::test]
    async fn test_finalize_falls_back_to_source_references() {
        let (_, generator) = generator(
            vec![json!({
                "title": "Async Rust",
                "article_body": "## One\n\nBody",
                "references": [],
                "full_text_markdown": "stale"
            })],
            ScriptedFetcher::new(),
        );
        let article = SynthesizedArticle::assemble(vec![], vec![], vec![]);
        let sources = vec!["https://a.example".to_string()];

        let final_article = generator
            .finalize(&request(), &article, &sources)
            .await
            .unwrap();

        assert_eq!(final_article.references, sources);
        assert!(final_article.full_text_markdown.is_empty());
    }
}

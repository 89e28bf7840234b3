//! Phase Generators
//!
//! The orchestrator only sees the [`Generator`] trait. Each method produces one
//! phase artifact (or one section of it) from explicit inputs.

mod llm;
mod prompts;

pub use llm::LlmGenerator;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{
    ArticlePlan, ArticleRequest, FinalArticle, Result, SectionPlan, SectionResearchRecord,
    SynthesizedArticle, SynthesizedSection,
};

/// Replacement research queries proposed after a section keeps failing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecoveredQueries {
    #[serde(default)]
    pub research_queries: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

impl RecoveredQueries {
    /// Non-blank queries only
    pub fn usable(&self) -> Vec<String> {
        self.research_queries
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    async fn plan(&self, request: &ArticleRequest) -> Result<ArticlePlan>;

    async fn research_section(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
    ) -> Result<SectionResearchRecord>;

    /// Propose improved queries for a section whose research keeps failing
    async fn recover_section(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
        failure: &str,
    ) -> Result<RecoveredQueries>;

    async fn synthesize_section(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
        research: &SectionResearchRecord,
    ) -> Result<SynthesizedSection>;

    async fn finalize(
        &self,
        request: &ArticleRequest,
        article: &SynthesizedArticle,
        sources: &[String],
    ) -> Result<FinalArticle>;

    async fn enhance(&self, request: &ArticleRequest, article: &FinalArticle)
    -> Result<FinalArticle>;
}

pub type SharedGenerator = Arc<dyn Generator>;

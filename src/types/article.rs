//! Article Data Model
//!
//! Closed record types flowing between pipeline phases. Every type here is
//! serializable because each one is (part of) a persisted phase artifact.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::{ValidationError, ValidationErrorKind};

// =============================================================================
// Run Request
// =============================================================================

/// Input collected by the entry point; passed explicitly to every generator call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleRequest {
    pub title: String,
    pub description: String,
    /// Target article length in words
    pub target_words: u32,
    /// Optional fixed section layout the plan must follow
    #[serde(default)]
    pub layout: Option<String>,
}

impl ArticleRequest {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            target_words: crate::constants::article::DEFAULT_TARGET_WORDS,
            layout: None,
        }
    }

    pub fn with_target_words(mut self, words: u32) -> Self {
        self.target_words = words;
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }
}

// =============================================================================
// Section Identity
// =============================================================================

/// Section identifier, unique within one run
///
/// Generators are inconsistent about emitting ids as numbers or numeric strings,
/// so both forms are accepted on input. Always serialized as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SectionId(pub u32);

impl SectionId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SectionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for SectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(SectionId(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<u32>()
                .map(SectionId)
                .map_err(|_| serde::de::Error::custom(format!("invalid section id '{}'", s))),
        }
    }
}

// =============================================================================
// Plan Phase
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleBrief {
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_length")]
    pub desired_length_words: u32,
}

fn default_tone() -> String {
    "informative".to_string()
}

fn default_length() -> u32 {
    crate::constants::article::DEFAULT_TARGET_WORDS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionPlan {
    pub section_id: SectionId,
    pub title: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub research_queries: Option<Vec<String>>,
}

impl SectionPlan {
    /// Research queries with blanks removed
    pub fn queries(&self) -> Vec<&str> {
        self.research_queries
            .iter()
            .flatten()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect()
    }

    pub fn has_queries(&self) -> bool {
        !self.queries().is_empty()
    }

    /// Copy of this plan with replacement research queries
    pub fn with_queries(&self, queries: Vec<String>) -> Self {
        Self {
            research_queries: Some(queries),
            ..self.clone()
        }
    }
}

/// Plan artifact: article brief plus sections in declaration order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticlePlan {
    pub brief: ArticleBrief,
    pub sections: Vec<SectionPlan>,
}

impl ArticlePlan {
    /// Boundary validation: at least one section, unique ids, titled sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sections.is_empty() {
            return Err(
                ValidationError::new(ValidationErrorKind::MissingField, "plan has no sections")
                    .with_field("sections"),
            );
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.section_id) {
                return Err(ValidationError::new(
                    ValidationErrorKind::Duplicate,
                    format!("section id {} appears more than once", section.section_id),
                )
                .with_field("section_id"));
            }
            if section.title.trim().is_empty() {
                return Err(ValidationError::new(
                    ValidationErrorKind::MissingField,
                    format!("section {} has an empty title", section.section_id),
                )
                .with_field("title"));
            }
        }

        Ok(())
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|s| s.section_id).collect()
    }

    pub fn query_count(&self) -> usize {
        self.sections.iter().map(|s| s.queries().len()).sum()
    }
}

// =============================================================================
// Research Phase
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionFinding {
    #[serde(default)]
    pub source_url: Option<String>,
    pub snippet: String,
    #[serde(default)]
    pub scraped_content: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionResearchRecord {
    pub section_id: SectionId,
    #[serde(default)]
    pub findings: Vec<SectionFinding>,
    pub summary: String,
    /// Attempts spent producing this record
    #[serde(default)]
    pub attempts: u32,
    /// Produced with recovery-substituted queries
    #[serde(default)]
    pub recovered: bool,
    /// Set when this record is a placeholder for a permanently failed section
    #[serde(default)]
    pub failure: Option<String>,
}

impl SectionResearchRecord {
    /// Placeholder for a section whose research failed permanently
    pub fn failed(section_id: SectionId, attempts: u32, cause: &str) -> Self {
        let cause = truncate_chars(cause, crate::constants::research::FAILURE_SUMMARY_CHARS);
        Self {
            section_id,
            findings: Vec::new(),
            summary: format!("Research failed: {}", cause),
            attempts,
            recovered: false,
            failure: Some(cause),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Research artifact, one record per planned section in plan order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResearchNotes {
    pub sections: Vec<SectionResearchRecord>,
}

impl ResearchNotes {
    pub fn get(&self, id: SectionId) -> Option<&SectionResearchRecord> {
        self.sections.iter().find(|r| r.section_id == id)
    }

    /// Unique source URLs in first-seen order
    pub fn source_urls(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sections
            .iter()
            .flat_map(|r| r.findings.iter())
            .filter_map(|f| f.source_url.as_deref())
            .filter(|url| seen.insert(*url))
            .map(str::to_string)
            .collect()
    }

    pub fn finding_count(&self) -> usize {
        self.sections.iter().map(|r| r.findings.len()).sum()
    }

    pub fn scraped_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|r| r.findings.iter())
            .filter(|f| f.scraped_content.is_some())
            .count()
    }
}

// =============================================================================
// Synthesis Phase
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesizedSection {
    pub section_id: SectionId,
    pub title: String,
    pub content: String,
}

/// Synthesis artifact; sections and full text follow plan declaration order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesizedArticle {
    pub sections: Vec<SynthesizedSection>,
    pub full_text: String,
    #[serde(default)]
    pub failed_sections: Vec<SectionId>,
    #[serde(default)]
    pub skipped_sections: Vec<SectionId>,
}

impl SynthesizedArticle {
    /// Join section bodies in the given (plan) order
    pub fn assemble(
        sections: Vec<SynthesizedSection>,
        failed_sections: Vec<SectionId>,
        skipped_sections: Vec<SectionId>,
    ) -> Self {
        let full_text = sections
            .iter()
            .map(|s| s.content.trim())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            sections,
            full_text,
            failed_sections,
            skipped_sections,
        }
    }

    pub fn word_count(&self) -> usize {
        self.full_text.split_whitespace().count()
    }
}

// =============================================================================
// Finalize / Enhance Phases
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalArticle {
    pub title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub meta_keywords: Vec<String>,
    #[serde(default)]
    pub image_description: String,
    #[serde(default)]
    pub table_of_contents: Vec<String>,
    #[serde(default)]
    pub tldr: String,
    pub article_body: String,
    #[serde(default)]
    pub conclusion: String,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub full_text_markdown: String,
    #[serde(default)]
    pub enhanced: bool,
}

impl FinalArticle {
    /// Markdown document assembled from the individual components
    pub fn render_markdown(&self) -> String {
        let mut out = format!("# {}\n\n", self.title.trim());

        if !self.table_of_contents.is_empty() {
            out.push_str("## Table of Contents\n\n");
            for (i, entry) in self.table_of_contents.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, entry));
            }
            out.push('\n');
        }

        if !self.tldr.trim().is_empty() {
            out.push_str(&format!("## TL;DR\n\n{}\n\n---\n\n", self.tldr.trim()));
        }

        out.push_str(self.article_body.trim());
        out.push_str("\n\n");

        if !self.conclusion.trim().is_empty() {
            out.push_str(&format!("---\n\n## Conclusion\n\n{}\n\n", self.conclusion.trim()));
        }

        if !self.references.is_empty() {
            out.push_str("---\n\n## References\n\n");
            for (i, reference) in self.references.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, reference));
            }
        }

        out.trim_end().to_string() + "\n"
    }

    /// Fill `full_text_markdown` when the generator left it empty
    pub fn ensure_markdown(mut self) -> Self {
        if self.full_text_markdown.trim().is_empty() {
            self.full_text_markdown = self.render_markdown();
        }
        self
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max).collect();
    out.push('…');
    out
}

//! Phase prompts and their response schemas

use serde_json::{Value, json};

use crate::ai::prompt::PromptBuilder;
use crate::constants::synthesis::MAX_FINDING_CHARS;
use crate::fetch::SearchHit;
use crate::types::article::truncate_chars;
use crate::types::{
    ArticleRequest, FinalArticle, SectionPlan, SectionResearchRecord, SynthesizedArticle,
};

/// One model call: role framing, task text, expected JSON shape
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
    pub schema: Value,
}

const PLANNER: &str = "You are the planner for a blog writing pipeline. You design clear, \
logically ordered article outlines with focused research queries.";

const RESEARCHER: &str = "You are a research assistant. You condense web search results into \
accurate notes for one section of an article.";

const RECOVERY: &str = "You are a research recovery specialist. You diagnose why web searches \
for an article section failed and propose better queries.";

const WRITER: &str = "You are a professional writer. You turn section plans and research notes \
into polished markdown sections.";

const FINALIZER: &str = "You are an editor assembling the final version of a blog article, \
including SEO metadata.";

const ENHANCER: &str = "You are a senior copy editor. You improve finished articles without \
changing their facts or structure.";

fn request_context(builder: PromptBuilder, request: &ArticleRequest) -> PromptBuilder {
    builder
        .context_item("Title", request.title.as_str())
        .context_item("Description", request.description.as_str())
        .context_item("Target length", format!("about {} words", request.target_words))
}

// =============================================================================
// Plan
// =============================================================================

pub fn plan(request: &ArticleRequest) -> Prompt {
    let mut builder = request_context(
        PromptBuilder::new().role("content strategist", "who plans research-backed articles"),
        request,
    )
    .objectives(&[
        "Write an article brief: topic, keywords, target audience, tone, desired length",
        "Split the article into ordered sections that together cover the topic",
        "Give every section a title, key points, and 2-4 focused web search queries",
    ]);

    if let Some(layout) = &request.layout {
        builder = builder.section(
            "Required Layout",
            format!(
                "Follow this section layout exactly, in this order:\n\n{}",
                layout.trim()
            ),
        );
    }

    let user = builder
        .guidelines(&[
            "Number sections with unique integer section_id values starting at 1",
            "Order sections so each builds on the previous one",
            "Queries must be specific to the topic, place, and time period; never generic",
            "desired_length_words should match the target length",
        ])
        .build();

    Prompt {
        system: PLANNER,
        user,
        schema: json!({
            "type": "object",
            "required": ["brief", "sections"],
            "properties": {
                "brief": {
                    "type": "object",
                    "required": ["topic"],
                    "properties": {
                        "topic": {"type": "string"},
                        "keywords": {"type": "array", "items": {"type": "string"}},
                        "target_audience": {"type": "string"},
                        "tone": {"type": "string"},
                        "desired_length_words": {"type": "integer"}
                    }
                },
                "sections": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["section_id", "title", "key_points", "research_queries"],
                        "properties": {
                            "section_id": {"type": "integer"},
                            "title": {"type": "string"},
                            "key_points": {"type": "array", "items": {"type": "string"}},
                            "research_queries": {"type": "array", "items": {"type": "string"}}
                        }
                    }
                }
            }
        }),
    }
}

// =============================================================================
// Research
// =============================================================================

pub fn research_digest(
    request: &ArticleRequest,
    section: &SectionPlan,
    hits: &[SearchHit],
) -> Prompt {
    let results = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}\nURL: {}\n{}", i + 1, hit.title, hit.url, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user = request_context(
        PromptBuilder::new().role("research analyst", "who summarizes search results"),
        request,
    )
    .context_item("Section", section.title.as_str())
    .context_item("Key points", section.key_points.join("; "))
    .section("Search Results", results)
    .objectives(&[
        "Summarize what the results say about this section's key points",
        "Score each result's relevance to the section between 0.0 and 1.0",
    ])
    .guidelines(&[
        "Only use facts present in the results",
        "Reference results by their URL exactly as given",
    ])
    .build();

    Prompt {
        system: RESEARCHER,
        user,
        schema: json!({
            "type": "object",
            "required": ["summary"],
            "properties": {
                "summary": {"type": "string"},
                "relevance": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["url", "score"],
                        "properties": {
                            "url": {"type": "string"},
                            "score": {"type": "number"}
                        }
                    }
                }
            }
        }),
    }
}

pub fn recover(request: &ArticleRequest, section: &SectionPlan, failure: &str) -> Prompt {
    let previous = if section.has_queries() {
        section.queries().join("\n")
    } else {
        "(none)".to_string()
    };

    let user = request_context(
        PromptBuilder::new().role("search specialist", "who rescues failed research"),
        request,
    )
    .context_item("Section", section.title.as_str())
    .context_item("Key points", section.key_points.join("; "))
    .section("Failed Queries", previous)
    .section("Failure", failure)
    .objectives(&[
        "Work out why the previous queries failed",
        "Propose 3-5 new queries that are likely to return concrete results",
        "Explain briefly why the new queries should work better",
    ])
    .guidelines(&[
        "New queries must differ substantially from the failed ones",
        "Include the current year for time-sensitive topics",
        "Prefer plain, searchable terms and question-style phrasing",
    ])
    .build();

    Prompt {
        system: RECOVERY,
        user,
        schema: json!({
            "type": "object",
            "required": ["research_queries", "rationale"],
            "properties": {
                "research_queries": {"type": "array", "items": {"type": "string"}},
                "rationale": {"type": "string"}
            }
        }),
    }
}

// =============================================================================
// Synthesis
// =============================================================================

fn research_material(research: &SectionResearchRecord) -> String {
    let mut out = format!("Summary: {}\n", research.summary.trim());
    for (i, finding) in research.findings.iter().enumerate() {
        out.push_str(&format!("\n[{}] ", i + 1));
        if let Some(url) = &finding.source_url {
            out.push_str(&format!("{}\n", url));
        }
        out.push_str(finding.snippet.trim());
        out.push('\n');
        if let Some(content) = &finding.scraped_content {
            out.push_str(&format!(
                "Page content:\n{}\n",
                truncate_chars(content, MAX_FINDING_CHARS)
            ));
        }
    }
    out
}

pub fn synthesize_section(
    request: &ArticleRequest,
    section: &SectionPlan,
    research: &SectionResearchRecord,
) -> Prompt {
    let user = request_context(
        PromptBuilder::new().role("writer", "who turns research into engaging prose"),
        request,
    )
    .context_item("Section", section.title.as_str())
    .section("Key Points", section.key_points.join("\n"))
    .section("Research Notes", research_material(research))
    .objectives(&[
        "Write this one section of the article in markdown",
        "Size the section as its share of the target article length",
        "Cover every key point, grounded in the research notes",
    ])
    .guidelines(&[
        "Start with an H2 heading for the section title",
        "Open with a two-sentence lead-in",
        "Use H3 subsections, lists, and quotes where they help readability",
        "Research notes may contain ads or unrelated text; ignore it",
        "Do not copy page content verbatim",
    ])
    .avoid(&["In conclusion", "To summarize", "In summary", "To recap"])
    .build();

    Prompt {
        system: WRITER,
        user,
        schema: json!({
            "type": "object",
            "required": ["title", "content"],
            "properties": {
                "title": {"type": "string"},
                "content": {"type": "string"}
            }
        }),
    }
}

// =============================================================================
// Finalize / Enhance
// =============================================================================

fn final_article_schema() -> Value {
    json!({
        "type": "object",
        "required": ["title", "meta_description", "meta_keywords", "image_description",
                     "table_of_contents", "tldr", "article_body", "conclusion", "references"],
        "properties": {
            "title": {"type": "string"},
            "meta_description": {"type": "string"},
            "meta_keywords": {"type": "array", "items": {"type": "string"}},
            "image_description": {"type": "string"},
            "table_of_contents": {"type": "array", "items": {"type": "string"}},
            "tldr": {"type": "string"},
            "article_body": {"type": "string"},
            "conclusion": {"type": "string"},
            "references": {"type": "array", "items": {"type": "string"}}
        }
    })
}

pub fn finalize(request: &ArticleRequest, article: &SynthesizedArticle, sources: &[String]) -> Prompt {
    let user = request_context(
        PromptBuilder::new().role("editor", "who publishes SEO-friendly articles"),
        request,
    )
    .section("Synthesized Content", article.full_text.as_str())
    .section("Source URLs", sources.join("\n"))
    .objectives(&[
        "Produce a title under 60 characters",
        "Write a 150-160 character meta description and a keyword list",
        "Describe a fitting main image",
        "List the main section headings as the table of contents",
        "Write a TL;DR of at most 100 words",
        "Smooth the synthesized content into one cohesive article body",
        "Write a conclusion that ties the article together",
        "List the unique source URLs as references",
    ])
    .guidelines(&[
        "article_body excludes the title, table of contents, TL;DR, conclusion and references",
        "article_body uses H2 for sections and H3 for subsections",
        "Keep the body close to the length of the synthesized content",
        "Remove repetition between sections and keep terminology consistent",
    ])
    .build();

    Prompt {
        system: FINALIZER,
        user,
        schema: final_article_schema(),
    }
}

pub fn enhance(request: &ArticleRequest, article: &FinalArticle) -> Prompt {
    let user = request_context(
        PromptBuilder::new().role("copy editor", "who polishes finished articles"),
        request,
    )
    .context_item("Current title", article.title.as_str())
    .section("TL;DR", article.tldr.as_str())
    .section("Article Body", article.article_body.as_str())
    .section("Conclusion", article.conclusion.as_str())
    .objectives(&[
        "Fix grammar, awkward phrasing and inconsistent tone",
        "Improve transitions and readability",
        "Return every field of the article, edited where useful",
    ])
    .guidelines(&[
        "Keep all facts, headings and references",
        "Keep markdown formatting intact",
    ])
    .build();

    Prompt {
        system: ENHANCER,
        user,
        schema: final_article_schema(),
    }
}

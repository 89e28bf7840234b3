//! Concurrent Section Synthesis
//!
//! Fans out one synthesis unit per section that has research, waits for all of
//! them, and reassembles results in plan declaration order. A failing unit
//! never cancels its siblings.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::ai::generator::SharedGenerator;
use crate::types::{
    ArticlePlan, ArticleRequest, QuillError, ResearchNotes, Result, SectionId,
    SynthesizedArticle, SynthesizedSection,
};

use super::status::SectionCounts;

#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub article: SynthesizedArticle,
    pub counts: SectionCounts,
}

pub struct SynthesisCoordinator {
    generator: SharedGenerator,
    concurrency: usize,
}

impl SynthesisCoordinator {
    pub fn new(generator: SharedGenerator, concurrency: usize) -> Self {
        Self {
            generator,
            concurrency: concurrency.max(1),
        }
    }

    /// Fails with `NoSectionsSynthesized` when not a single section succeeds
    #[instrument(skip_all, fields(sections = plan.sections.len(), concurrency = self.concurrency))]
    pub async fn synthesize(
        &self,
        request: &ArticleRequest,
        plan: &ArticlePlan,
        research: &ResearchNotes,
    ) -> Result<SynthesisResult> {
        let mut skipped: Vec<SectionId> = Vec::new();
        let mut units = Vec::new();
        for (index, section) in plan.sections.iter().enumerate() {
            match research.get(section.section_id) {
                Some(record) => units.push((index, section, record)),
                None => {
                    warn!(section = %section.section_id, "No research record; skipping synthesis");
                    skipped.push(section.section_id);
                }
            }
        }

        let mut results: Vec<(usize, SectionId, Result<SynthesizedSection>)> =
            stream::iter(units)
                .map(|(index, section, record)| async move {
                    let result = self
                        .generator
                        .synthesize_section(request, section, record)
                        .await
                        .map(|mut synthesized| {
                            if synthesized.section_id != section.section_id {
                                debug!(
                                    expected = %section.section_id,
                                    got = %synthesized.section_id,
                                    "Re-keying synthesized section to planned id"
                                );
                                synthesized.section_id = section.section_id;
                            }
                            synthesized
                        });
                    (index, section.section_id, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        // Completion order is arbitrary; restore declaration order
        results.sort_by_key(|(index, _, _)| *index);

        let mut sections = Vec::new();
        let mut failed = Vec::new();
        for (_, id, result) in results {
            match result {
                Ok(section) => sections.push(section),
                Err(e) => {
                    warn!(section = %id, "Synthesis failed: {}", e);
                    failed.push(id);
                }
            }
        }

        let counts = SectionCounts {
            succeeded: sections.len(),
            recovered: 0,
            failed: failed.len(),
            skipped: skipped.len(),
        };

        if sections.is_empty() {
            return Err(QuillError::NoSectionsSynthesized {
                failed: failed.len(),
                skipped: skipped.len(),
            });
        }

        info!("Synthesis complete: {}", counts);
        Ok(SynthesisResult {
            article: SynthesizedArticle::assemble(sections, failed, skipped),
            counts,
        })
    }
}

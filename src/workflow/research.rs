//! Section Research Coordinator
//!
//! Researches every planned section independently with bounded concurrency.
//! Each section gets bounded retries and one recovery escalation; a section
//! that still fails becomes a placeholder record so coverage stays complete.
//!
//! ## Per-section state machine
//!
//! ```text
//! Pending → Attempting ─┬→ Succeeded
//!                       ├→ RetryScheduled → Attempting      (attempts < max_retries)
//!                       ├→ RecoveryAttempted → Attempting   (once, with improved queries)
//!                       └→ Failed                           (placeholder record)
//! ```

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::ai::generator::SharedGenerator;
use crate::config::PipelineConfig;
use crate::types::{
    ArticleRequest, QuillError, ResearchNotes, Result, SectionPlan, SectionResearchRecord,
};

use super::retry::{RetryPolicy, retry_with_escalation};
use super::status::SectionCounts;

/// Research artifact plus per-section outcome counts
#[derive(Debug, Clone)]
pub struct ResearchResult {
    pub notes: ResearchNotes,
    pub counts: SectionCounts,
}

pub struct ResearchCoordinator {
    generator: SharedGenerator,
    policy: RetryPolicy,
    concurrency: usize,
    empty_research_is_failure: bool,
}

impl ResearchCoordinator {
    pub fn new(generator: SharedGenerator, config: &PipelineConfig) -> Self {
        Self {
            generator,
            policy: RetryPolicy::from_config(config),
            concurrency: config.research_concurrency.max(1),
            empty_research_is_failure: config.empty_research_is_failure,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// One record per input section, in input order
    #[instrument(skip_all, fields(sections = sections.len(), concurrency = self.concurrency))]
    pub async fn research(
        &self,
        request: &ArticleRequest,
        sections: &[SectionPlan],
    ) -> ResearchResult {
        let records: Vec<(SectionResearchRecord, bool)> = stream::iter(sections)
            .map(|section| self.research_section(request, section))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut counts = SectionCounts::default();
        let mut notes = ResearchNotes::default();
        for (record, ok) in records {
            if ok {
                counts.succeeded += 1;
                if record.recovered {
                    counts.recovered += 1;
                }
            } else {
                counts.failed += 1;
            }
            notes.sections.push(record);
        }

        info!(
            "Research complete: {} succeeded ({} recovered), {} failed",
            counts.succeeded, counts.recovered, counts.failed
        );
        ResearchResult { notes, counts }
    }

    /// Returns the record and whether it is a real (non-placeholder) result
    async fn research_section(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
    ) -> (SectionResearchRecord, bool) {
        let outcome = retry_with_escalation(
            &self.policy,
            section.clone(),
            move |plan: SectionPlan| async move { self.attempt(request, &plan).await },
            move |plan: SectionPlan, failure: String| async move {
                self.recover(request, &plan, &failure).await
            },
        )
        .await;

        match outcome.result {
            Ok(mut record) => {
                record.attempts = outcome.attempts;
                record.recovered = outcome.recovered;
                debug!(
                    section = %section.section_id,
                    attempts = outcome.attempts,
                    findings = record.findings.len(),
                    "Section researched"
                );
                (record, true)
            }
            Err(e) => {
                let exhausted = QuillError::RecoveryExhausted {
                    section_id: section.section_id.get(),
                    attempts: outcome.attempts,
                    reason: e.to_string(),
                };
                warn!("{}", exhausted);
                (
                    SectionResearchRecord::failed(
                        section.section_id,
                        outcome.attempts,
                        &e.to_string(),
                    ),
                    false,
                )
            }
        }
    }

    async fn attempt(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
    ) -> Result<SectionResearchRecord> {
        let mut record = self.generator.research_section(request, section).await?;

        if record.section_id != section.section_id {
            debug!(
                expected = %section.section_id,
                got = %record.section_id,
                "Re-keying research record to planned section id"
            );
            record.section_id = section.section_id;
        }

        if self.empty_research_is_failure && section.has_queries() && record.findings.is_empty() {
            return Err(QuillError::EmptyOutcome {
                phase: "research".to_string(),
                reason: format!("no findings for section {}", section.section_id),
            });
        }

        record.failure = None;
        Ok(record)
    }

    async fn recover(
        &self,
        request: &ArticleRequest,
        section: &SectionPlan,
        failure: &str,
    ) -> Option<SectionPlan> {
        match self
            .generator
            .recover_section(request, section, failure)
            .await
        {
            Ok(recovered) => {
                let queries = recovered.usable();
                if queries.is_empty() {
                    warn!(section = %section.section_id, "Recovery proposed no queries");
                    return None;
                }
                info!(
                    section = %section.section_id,
                    queries = queries.len(),
                    "Recovery proposed new queries: {}",
                    recovered.rationale
                );
                Some(section.with_queries(queries))
            }
            Err(e) => {
                warn!(section = %section.section_id, "Recovery failed: {}", e);
                None
            }
        }
    }
}

//! Article Workflow Orchestration
//!
//! Sequences the six phases, persisting each artifact through the
//! [`PhaseRunner`] so an interrupted run resumes where it stopped.
//!
//! ## Phase Handling
//!
//! | Phase      | Required | On failure                          |
//! |------------|----------|-------------------------------------|
//! | plan       | yes      | run fails, downstream skipped       |
//! | research   | yes      | run fails, downstream skipped       |
//! | augment    | no       | research passed through (degraded)  |
//! | synthesize | yes      | run fails, downstream skipped       |
//! | finalize   | yes      | run fails, downstream skipped       |
//! | enhance    | no       | final article kept (degraded)       |
//!
//! [`WorkflowOrchestrator::run`] never returns an error; every failure is
//! folded into the [`RunReport`].

pub mod augment;
pub mod phase;
pub mod report;
pub mod research;
pub mod retry;
pub mod runner;
pub mod status;
pub mod synthesis;

pub use augment::{AugmentResult, AugmentStats, ContentAugmenter};
pub use phase::Phase;
pub use report::{PhaseReport, RunOutcome, RunReport, RunState};
pub use research::{ResearchCoordinator, ResearchResult};
pub use retry::{RetryOutcome, RetryPolicy, retry_with_escalation};
pub use runner::{PhaseOutcome, PhaseRunner};
pub use status::{
    BroadcastReporter, PhaseStatus, SectionCounts, SharedReporter, StatusEvent, StatusReporter,
    TracingReporter,
};
pub use synthesis::{SynthesisCoordinator, SynthesisResult};

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use crate::ai::generator::SharedGenerator;
use crate::config::{FetchConfig, PipelineConfig};
use crate::fetch::SharedFetcher;
use crate::storage::SharedCheckpointStore;
use crate::types::{
    ArticlePlan, ArticleRequest, QuillError, ResearchNotes, Result, RunId, SynthesizedArticle,
};

/// A phase that ended the run
struct PhaseFailure {
    phase: Phase,
    error: QuillError,
}

impl PhaseFailure {
    fn new(phase: Phase, error: QuillError) -> Self {
        Self { phase, error }
    }

    fn missing(phase: Phase, dependency: Phase) -> Self {
        Self::new(
            phase,
            QuillError::MissingDependency {
                phase: phase.to_string(),
                dependency: dependency.to_string(),
            },
        )
    }
}

type Step<T> = std::result::Result<T, PhaseFailure>;

pub struct WorkflowOrchestrator {
    generator: SharedGenerator,
    runner: PhaseRunner,
    reporter: SharedReporter,
    research: ResearchCoordinator,
    augmenter: ContentAugmenter,
    synthesis: SynthesisCoordinator,
    config: PipelineConfig,
}

impl WorkflowOrchestrator {
    pub fn new(
        generator: SharedGenerator,
        fetcher: SharedFetcher,
        store: SharedCheckpointStore,
        config: PipelineConfig,
        fetch_config: &FetchConfig,
    ) -> Self {
        Self {
            research: ResearchCoordinator::new(generator.clone(), &config),
            augmenter: ContentAugmenter::new(fetcher, fetch_config),
            synthesis: SynthesisCoordinator::new(generator.clone(), config.synthesis_concurrency),
            runner: PhaseRunner::new(store).with_invalidation(config.invalidate_on_input_change),
            reporter: Arc::new(TracingReporter),
            generator,
            config,
        }
    }

    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn store(&self) -> &SharedCheckpointStore {
        self.runner.store()
    }

    /// Execute (or resume) the run for this request
    #[instrument(skip_all, fields(title = %request.title))]
    pub async fn run(&self, request: &ArticleRequest) -> RunReport {
        let started = Instant::now();
        let mut state = RunState::new(RunId::from_title(&request.title));

        info!(
            run = %state.run_id,
            execution = %state.execution_id,
            "Starting article run"
        );
        self.reporter.report(&StatusEvent::run(
            PhaseStatus::Running,
            format!("Run '{}' started", state.run_id),
            false,
        ));

        let outcome = match self.execute(request, &mut state).await {
            Ok(()) => self.completion_outcome(&state),
            Err(failure) => self.halt(&mut state, failure),
        };

        let run_status = match &outcome {
            RunOutcome::Completed => PhaseStatus::Succeeded,
            RunOutcome::CompletedDegraded => PhaseStatus::Degraded,
            RunOutcome::FailedAt { .. } => PhaseStatus::Failed,
        };
        self.reporter.report(&StatusEvent::run(
            run_status,
            format!("Run '{}' {}", state.run_id, outcome),
            true,
        ));

        let duration = started.elapsed();
        info!(run = %state.run_id, outcome = %outcome, elapsed_ms = duration.as_millis() as u64, "Run finished");
        state.into_report(outcome, duration)
    }

    async fn execute(&self, request: &ArticleRequest, state: &mut RunState) -> Step<()> {
        let run = state.run_id.clone();

        // Phase 1: Plan
        self.start(Phase::Plan);
        let result = self
            .runner
            .run(&run, Phase::Plan, request, || async move {
                let plan = self.generator.plan(request).await?;
                plan.validate()?;
                Ok(plan)
            })
            .await;
        let plan = self.settle_required(state, Phase::Plan, result, |plan: &ArticlePlan| {
            (format!("{} sections planned", plan.sections.len()), None)
        })?;
        state.plan = Some(plan);

        // Phase 2: Research
        self.start(Phase::Research);
        let plan = state
            .plan
            .as_ref()
            .ok_or_else(|| PhaseFailure::missing(Phase::Research, Phase::Plan))?;
        let result = self
            .runner
            .run(&run, Phase::Research, &(request, plan), || async move {
                let researched = self.research.research(request, &plan.sections).await;
                // All-failed notes must not be checkpointed as a success
                if researched.counts.succeeded == 0 {
                    return Err(QuillError::NoSectionsResearched {
                        failed: researched.counts.failed,
                    });
                }
                Ok(researched.notes)
            })
            .await;
        let research = self.settle_required(state, Phase::Research, result, |notes| {
            let counts = research_counts(notes);
            (counts.to_string(), Some(counts))
        })?;

        // Phase 3: Augment (optional)
        let research = if self.config.augment {
            self.start(Phase::Augment);
            let upstream = &research;
            let result = self
                .runner
                .run(&run, Phase::Augment, upstream, || async move {
                    Ok(self.augmenter.augment(upstream).await?.notes)
                })
                .await;
            self.settle_optional(state, Phase::Augment, result, research.clone(), |notes| {
                (AugmentStats::from_notes(notes).to_string(), None)
            })?
        } else {
            self.disable(state, Phase::Augment);
            research
        };
        state.research = Some(research);

        // Phase 4: Synthesize
        self.start(Phase::Synthesize);
        let plan = state
            .plan
            .as_ref()
            .ok_or_else(|| PhaseFailure::missing(Phase::Synthesize, Phase::Plan))?;
        let research = state
            .research
            .as_ref()
            .ok_or_else(|| PhaseFailure::missing(Phase::Synthesize, Phase::Research))?;
        let result = self
            .runner
            .run(&run, Phase::Synthesize, &(plan, research), || async move {
                Ok(self
                    .synthesis
                    .synthesize(request, plan, research)
                    .await?
                    .article)
            })
            .await;
        let sources = research.source_urls();
        let synthesized =
            self.settle_required(state, Phase::Synthesize, result, |article| {
                let counts = synthesis_counts(article);
                (
                    format!("{} words; {}", article.word_count(), counts),
                    Some(counts),
                )
            })?;
        state.synthesized = Some(synthesized);

        // Phase 5: Finalize
        self.start(Phase::Finalize);
        let synthesized = state
            .synthesized
            .as_ref()
            .ok_or_else(|| PhaseFailure::missing(Phase::Finalize, Phase::Synthesize))?;
        let sources = &sources;
        let result = self
            .runner
            .run(&run, Phase::Finalize, &(synthesized, sources), || async move {
                let article = self
                    .generator
                    .finalize(request, synthesized, sources)
                    .await?;
                Ok(article.ensure_markdown())
            })
            .await;
        let article = self.settle_required(state, Phase::Finalize, result, |article| {
            (format!("'{}' finalized", article.title), None)
        })?;

        // Phase 6: Enhance (optional)
        let article = if self.config.enhance {
            self.start(Phase::Enhance);
            let upstream = &article;
            let result = self
                .runner
                .run(&run, Phase::Enhance, upstream, || async move {
                    let mut enhanced = self.generator.enhance(request, upstream).await?;
                    enhanced.enhanced = true;
                    enhanced.full_text_markdown = String::new();
                    Ok(enhanced.ensure_markdown())
                })
                .await;
            self.settle_optional(state, Phase::Enhance, result, article.clone(), |a| {
                (format!("'{}' enhanced", a.title), None)
            })?
        } else {
            self.disable(state, Phase::Enhance);
            article
        };
        state.article = Some(article);

        Ok(())
    }

    // =========================================================================
    // Phase Bookkeeping
    // =========================================================================

    fn start(&self, phase: Phase) {
        info!("Phase {}: {}", phase.as_u8(), phase.name());
        self.reporter.report(&StatusEvent::phase(
            phase,
            PhaseStatus::Running,
            format!("{} started", phase.name()),
        ));
    }

    fn finish(
        &self,
        state: &mut RunState,
        phase: Phase,
        status: PhaseStatus,
        summary: String,
        counts: Option<SectionCounts>,
    ) {
        self.reporter
            .report(&StatusEvent::phase(phase, status, summary.clone()).with_counts(counts));
        state.set(phase, status, summary, counts);
    }

    fn disable(&self, state: &mut RunState, phase: Phase) {
        info!("Phase {}: {} disabled", phase.as_u8(), phase.name());
        self.finish(
            state,
            phase,
            PhaseStatus::Skipped,
            "disabled by configuration".to_string(),
            None,
        );
    }

    fn settle_required<T, D>(
        &self,
        state: &mut RunState,
        phase: Phase,
        result: Result<PhaseOutcome<T>>,
        describe: D,
    ) -> Step<T>
    where
        D: FnOnce(&T) -> (String, Option<SectionCounts>),
    {
        match result {
            Ok(PhaseOutcome::Cached(artifact)) => {
                let (summary, counts) = describe(&artifact);
                self.finish(state, phase, PhaseStatus::Cached, summary, counts);
                Ok(artifact)
            }
            Ok(PhaseOutcome::Succeeded(artifact)) => {
                let (summary, counts) = describe(&artifact);
                self.finish(state, phase, PhaseStatus::Succeeded, summary, counts);
                Ok(artifact)
            }
            Ok(PhaseOutcome::Failed(error)) | Err(error) => Err(PhaseFailure::new(phase, error)),
        }
    }

    /// Like [`Self::settle_required`], but generation failures degrade to `fallback`
    ///
    /// Storage failures still end the run.
    fn settle_optional<T, D>(
        &self,
        state: &mut RunState,
        phase: Phase,
        result: Result<PhaseOutcome<T>>,
        fallback: T,
        describe: D,
    ) -> Step<T>
    where
        D: FnOnce(&T) -> (String, Option<SectionCounts>),
    {
        match result {
            Ok(PhaseOutcome::Failed(error)) => {
                tracing::warn!("{} degraded: {}", phase.name(), error);
                self.finish(
                    state,
                    phase,
                    PhaseStatus::Degraded,
                    format!("{}; passing upstream artifact through", error),
                    None,
                );
                Ok(fallback)
            }
            other => self.settle_required(state, phase, other, describe),
        }
    }

    fn halt(&self, state: &mut RunState, failure: PhaseFailure) -> RunOutcome {
        let PhaseFailure { phase, error } = failure;
        tracing::error!("{} failed: {}", phase.name(), error);
        self.finish(state, phase, PhaseStatus::Failed, error.to_string(), None);

        let reason = format!("{} failed", phase);
        for later in phase.downstream() {
            self.finish(state, later, PhaseStatus::Skipped, reason.clone(), None);
        }

        RunOutcome::FailedAt {
            phase,
            reason: error.to_string(),
        }
    }

    fn completion_outcome(&self, state: &RunState) -> RunOutcome {
        let degraded = state.phases.iter().any(|p| {
            p.status == PhaseStatus::Degraded
                || p.counts.is_some_and(|c| c.failed > 0 || c.skipped > 0)
        });
        if degraded {
            RunOutcome::CompletedDegraded
        } else {
            RunOutcome::Completed
        }
    }
}

fn research_counts(notes: &ResearchNotes) -> SectionCounts {
    let mut counts = SectionCounts::default();
    for record in &notes.sections {
        if record.is_failed() {
            counts.failed += 1;
        } else {
            counts.succeeded += 1;
            if record.recovered {
                counts.recovered += 1;
            }
        }
    }
    counts
}

fn synthesis_counts(article: &SynthesizedArticle) -> SectionCounts {
    SectionCounts {
        succeeded: article.sections.len(),
        recovered: 0,
        failed: article.failed_sections.len(),
        skipped: article.skipped_sections.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CheckpointBackend, CheckpointStore, MemoryBackend};
    use crate::testing::{
        RecordingReporter, ScriptedFetcher, ScriptedGenerator, request, sample_plan,
        test_pipeline_config,
    };
    use crate::types::SectionId;

    struct Harness {
        backend: Arc<MemoryBackend>,
        generator: Arc<ScriptedGenerator>,
        reporter: Arc<RecordingReporter>,
        orchestrator: WorkflowOrchestrator,
    }

    fn harness_with(
        generator: ScriptedGenerator,
        fetcher: ScriptedFetcher,
        config: PipelineConfig,
    ) -> Harness {
        harness_on(Arc::new(MemoryBackend::new()), generator, fetcher, config)
    }

    fn harness_on(
        backend: Arc<MemoryBackend>,
        generator: ScriptedGenerator,
        fetcher: ScriptedFetcher,
        config: PipelineConfig,
    ) -> Harness {
        let store = Arc::new(CheckpointStore::new(backend.clone()));
        let generator = Arc::new(generator);
        let reporter = Arc::new(RecordingReporter::default());
        let orchestrator = WorkflowOrchestrator::new(
            generator.clone(),
            Arc::new(fetcher),
            store,
            config,
            &FetchConfig::default(),
        )
        .with_reporter(reporter.clone());
        Harness {
            backend,
            generator,
            reporter,
            orchestrator,
        }
    }

    fn harness(generator: ScriptedGenerator) -> Harness {
        harness_with(
            generator,
            ScriptedFetcher::serving_sample_pages(),
            test_pipeline_config(),
        )
    }

    #[tokio::test]
    async fn test_full_run_completes() {
        let h = harness(ScriptedGenerator::new(sample_plan(3)));

        let report = h.orchestrator.run(&request()).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        for phase in Phase::ALL {
            assert_eq!(report.status(phase), Some(PhaseStatus::Succeeded), "{}", phase);
        }
        let article = report.article.as_ref().unwrap();
        assert!(article.enhanced);
        assert!(article.full_text_markdown.starts_with("# "));
        assert_eq!(h.backend.len(), Phase::COUNT);
    }

    #[tokio::test]
    async fn test_rerun_is_served_from_cache() {
        let h = harness(ScriptedGenerator::new(sample_plan(3)));

        let first = h.orchestrator.run(&request()).await;
        let second = h.orchestrator.run(&request()).await;

        assert_ne!(first.execution_id, second.execution_id);
        for phase in Phase::ALL {
            assert_eq!(second.status(phase), Some(PhaseStatus::Cached), "{}", phase);
        }
        assert_eq!(first.article, second.article);
        assert_eq!(h.generator.calls("plan"), 1);
        assert_eq!(h.generator.calls("research:1"), 1);
        assert_eq!(h.generator.calls("finalize"), 1);
    }

    #[tokio::test]
    async fn test_required_failure_halts_downstream() {
        let h = harness(ScriptedGenerator::new(sample_plan(2)).fail_finalize());

        let report = h.orchestrator.run(&request()).await;

        assert!(matches!(
            report.outcome,
            RunOutcome::FailedAt {
                phase: Phase::Finalize,
                ..
            }
        ));
        assert_eq!(report.status(Phase::Synthesize), Some(PhaseStatus::Succeeded));
        assert_eq!(report.status(Phase::Finalize), Some(PhaseStatus::Failed));
        assert_eq!(report.status(Phase::Enhance), Some(PhaseStatus::Skipped));
        assert_eq!(h.generator.calls("enhance"), 0);
        assert!(report.article.is_none());

        let run = RunId::from_title(&request().title);
        assert!(!h.backend.contains(&run, Phase::Finalize).unwrap());
    }

    #[tokio::test]
    async fn test_invalid_plan_fails_plan_phase() {
        let mut plan = sample_plan(2);
        plan.sections[1].section_id = SectionId(1);
        let h = harness(ScriptedGenerator::new(plan));

        let report = h.orchestrator.run(&request()).await;

        assert!(matches!(
            report.outcome,
            RunOutcome::FailedAt {
                phase: Phase::Plan,
                ..
            }
        ));
        assert_eq!(h.generator.calls("research:1"), 0);
        assert!(h.backend.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failures_degrade_to_unmodified_research() {
        let h = harness_with(
            ScriptedGenerator::new(sample_plan(3)),
            ScriptedFetcher::new().fail_all(),
            test_pipeline_config(),
        );

        let report = h.orchestrator.run(&request()).await;

        assert_eq!(report.outcome, RunOutcome::CompletedDegraded);
        assert_eq!(report.status(Phase::Augment), Some(PhaseStatus::Degraded));
        assert_eq!(report.status(Phase::Synthesize), Some(PhaseStatus::Succeeded));
        assert!(report.article.is_some());

        let run = RunId::from_title(&request().title);
        assert!(!h.backend.contains(&run, Phase::Augment).unwrap());
        let research: ResearchNotes = h
            .orchestrator
            .store()
            .get(&run, Phase::Research)
            .unwrap()
            .unwrap();
        assert!(
            research
                .sections
                .iter()
                .flat_map(|r| &r.findings)
                .all(|f| f.scraped_content.is_none())
        );
    }

    #[tokio::test]
    async fn test_enhance_failure_keeps_final_article() {
        let h = harness(ScriptedGenerator::new(sample_plan(2)).fail_enhance());

        let report = h.orchestrator.run(&request()).await;

        assert_eq!(report.outcome, RunOutcome::CompletedDegraded);
        assert_eq!(report.status(Phase::Enhance), Some(PhaseStatus::Degraded));
        assert!(!report.article.as_ref().unwrap().enhanced);
    }

    #[tokio::test]
    async fn test_disabled_optional_phases_are_skipped() {
        let mut config = test_pipeline_config();
        config.augment = false;
        config.enhance = false;
        let h = harness_with(
            ScriptedGenerator::new(sample_plan(2)),
            ScriptedFetcher::new().fail_all(),
            config,
        );

        let report = h.orchestrator.run(&request()).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.status(Phase::Augment), Some(PhaseStatus::Skipped));
        assert_eq!(report.status(Phase::Enhance), Some(PhaseStatus::Skipped));
        assert_eq!(h.generator.calls("enhance"), 0);
    }

    #[tokio::test]
    async fn test_section_failure_is_contained_and_counted() {
        let h = harness(
            ScriptedGenerator::new(sample_plan(5))
                .always_fail_research(4)
                .without_recovery(),
        );

        let report = h.orchestrator.run(&request()).await;

        assert_eq!(report.outcome, RunOutcome::CompletedDegraded);
        let research = report.phase(Phase::Research).unwrap();
        let counts = research.counts.unwrap();
        assert_eq!((counts.succeeded, counts.failed), (4, 1));
        assert!(report.article.is_some());
    }

    #[tokio::test]
    async fn test_research_outage_is_not_cached() {
        let backend = Arc::new(MemoryBackend::new());
        let outage = harness_on(
            backend.clone(),
            ScriptedGenerator::new(sample_plan(3))
                .always_fail_research(1)
                .always_fail_research(2)
                .always_fail_research(3)
                .without_recovery(),
            ScriptedFetcher::serving_sample_pages(),
            test_pipeline_config(),
        );

        let report = outage.orchestrator.run(&request()).await;

        assert!(matches!(
            report.outcome,
            RunOutcome::FailedAt {
                phase: Phase::Research,
                ..
            }
        ));
        assert_eq!(report.status(Phase::Synthesize), Some(PhaseStatus::Skipped));
        let run = RunId::from_title(&request().title);
        assert!(backend.contains(&run, Phase::Plan).unwrap());
        assert!(!backend.contains(&run, Phase::Research).unwrap());

        let healthy = harness_on(
            backend.clone(),
            ScriptedGenerator::new(sample_plan(3)),
            ScriptedFetcher::serving_sample_pages(),
            test_pipeline_config(),
        );
        let report = healthy.orchestrator.run(&request()).await;

        assert_eq!(report.status(Phase::Plan), Some(PhaseStatus::Cached));
        assert_eq!(report.status(Phase::Research), Some(PhaseStatus::Succeeded));
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(healthy.generator.calls("research:1"), 1);
    }

    #[tokio::test]
    async fn test_augment_summary_carries_success_rate() {
        let h = harness(ScriptedGenerator::new(sample_plan(2)));

        let first = h.orchestrator.run(&request()).await;
        let second = h.orchestrator.run(&request()).await;

        let run = RunId::from_title(&request().title);
        let augmented: ResearchNotes = h
            .orchestrator
            .store()
            .get(&run, Phase::Augment)
            .unwrap()
            .unwrap();
        let expected = AugmentStats::from_notes(&augmented).to_string();
        assert!(expected.ends_with("%)"));
        assert_eq!(first.phase(Phase::Augment).unwrap().summary, expected);
        assert_eq!(second.phase(Phase::Augment).unwrap().summary, expected);

        let event = h
            .reporter
            .events()
            .into_iter()
            .find(|e| e.phase == Some(Phase::Augment) && e.status == PhaseStatus::Succeeded)
            .unwrap();
        assert_eq!(event.message, expected);
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_regenerated_on_resume() {
        let h = harness(ScriptedGenerator::new(sample_plan(2)));
        h.orchestrator.run(&request()).await;

        let run = RunId::from_title(&request().title);
        h.backend
            .write(&run, Phase::Synthesize, "{\"truncated\":")
            .unwrap();

        let report = h.orchestrator.run(&request()).await;

        assert_eq!(report.status(Phase::Research), Some(PhaseStatus::Cached));
        assert_eq!(report.status(Phase::Synthesize), Some(PhaseStatus::Succeeded));
        assert_eq!(h.generator.calls("synthesize:1"), 2);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_status_events_cover_every_transition() {
        let h = harness(ScriptedGenerator::new(sample_plan(2)).fail_finalize());

        h.orchestrator.run(&request()).await;

        let events = h.reporter.events();
        let first = events.first().unwrap();
        let last = events.last().unwrap();
        assert!(first.phase.is_none() && !first.done);
        assert!(last.phase.is_none() && last.done);
        assert_eq!(last.status, PhaseStatus::Failed);

        for phase in [Phase::Plan, Phase::Research, Phase::Synthesize, Phase::Finalize] {
            assert!(
                events
                    .iter()
                    .any(|e| e.phase == Some(phase) && e.status == PhaseStatus::Running)
            );
        }
        assert!(
            events
                .iter()
                .any(|e| e.phase == Some(Phase::Enhance) && e.status == PhaseStatus::Skipped)
        );
        let research = events
            .iter()
            .find(|e| e.phase == Some(Phase::Research) && e.status == PhaseStatus::Succeeded)
            .unwrap();
        assert_eq!(research.counts.unwrap().succeeded, 2);
    }
}

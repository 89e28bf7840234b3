//! Run State and Report

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::types::{ArticlePlan, FinalArticle, ResearchNotes, RunId, SynthesizedArticle};

use super::Phase;
use super::status::{PhaseStatus, SectionCounts};

/// Per-phase entry of a run report
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub summary: String,
    pub counts: Option<SectionCounts>,
}

/// Overall result of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Finished, but an optional phase degraded or sections were lost
    CompletedDegraded,
    FailedAt { phase: Phase, reason: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::FailedAt { .. })
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::CompletedDegraded => write!(f, "completed (degraded)"),
            Self::FailedAt { phase, reason } => write!(f, "failed at {}: {}", phase, reason),
        }
    }
}

/// Mutable state accumulated while the orchestrator runs
#[derive(Debug)]
pub struct RunState {
    pub run_id: RunId,
    pub execution_id: Uuid,
    pub phases: Vec<PhaseReport>,
    pub plan: Option<ArticlePlan>,
    pub research: Option<ResearchNotes>,
    pub synthesized: Option<SynthesizedArticle>,
    pub article: Option<FinalArticle>,
}

impl RunState {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            execution_id: Uuid::new_v4(),
            phases: Phase::ALL
                .into_iter()
                .map(|phase| PhaseReport {
                    phase,
                    status: PhaseStatus::Pending,
                    summary: String::new(),
                    counts: None,
                })
                .collect(),
            plan: None,
            research: None,
            synthesized: None,
            article: None,
        }
    }

    pub fn status(&self, phase: Phase) -> PhaseStatus {
        self.entry(phase).status
    }

    fn entry(&self, phase: Phase) -> &PhaseReport {
        // Phases are stored in declaration order
        &self.phases[phase.as_u8() as usize - 1]
    }

    pub fn set(
        &mut self,
        phase: Phase,
        status: PhaseStatus,
        summary: impl Into<String>,
        counts: Option<SectionCounts>,
    ) {
        let entry = &mut self.phases[phase.as_u8() as usize - 1];
        entry.status = status;
        entry.summary = summary.into();
        entry.counts = counts;
    }

    /// Mark every phase after `phase` as skipped
    pub fn skip_downstream(&mut self, phase: Phase, reason: &str) {
        for later in phase.downstream() {
            self.set(later, PhaseStatus::Skipped, reason, None);
        }
    }

    pub fn into_report(self, outcome: RunOutcome, duration: Duration) -> RunReport {
        RunReport {
            run_id: self.run_id,
            execution_id: self.execution_id,
            outcome,
            phases: self.phases,
            duration,
            article: self.article,
        }
    }
}

/// Final report of a run; never an error
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub execution_id: Uuid,
    pub outcome: RunOutcome,
    pub phases: Vec<PhaseReport>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    #[serde(skip)]
    pub article: Option<FinalArticle>,
}

impl RunReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn status(&self, phase: Phase) -> Option<PhaseStatus> {
        self.phase(phase).map(|p| p.status)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

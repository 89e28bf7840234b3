//! Run Status Events
//!
//! Every phase transition is published to a [`StatusReporter`]. Reporting is
//! synchronous and must not block; reporters that fan out drop events nobody
//! is listening for.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::constants::status::CHANNEL_CAPACITY;

use super::Phase;

/// Phase status as tracked in the run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Pending,
    Running,
    Cached,
    Succeeded,
    Degraded,
    Failed,
    Skipped,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Cached => "cached",
            Self::Succeeded => "succeeded",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the phase left a usable artifact for downstream phases
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Cached | Self::Succeeded | Self::Degraded)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-section outcome counts for fan-out phases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionCounts {
    pub succeeded: usize,
    /// Subset of `succeeded` that needed recovery
    pub recovered: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SectionCounts {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

impl std::fmt::Display for SectionCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ok", self.succeeded)?;
        if self.recovered > 0 {
            write!(f, " ({} recovered)", self.recovered)?;
        }
        write!(f, ", {} failed", self.failed)?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// One status update; `phase` is `None` for run-level events
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub phase: Option<Phase>,
    pub status: PhaseStatus,
    pub message: String,
    pub counts: Option<SectionCounts>,
    pub done: bool,
}

impl StatusEvent {
    pub fn run(status: PhaseStatus, message: impl Into<String>, done: bool) -> Self {
        Self {
            phase: None,
            status,
            message: message.into(),
            counts: None,
            done,
        }
    }

    pub fn phase(phase: Phase, status: PhaseStatus, message: impl Into<String>) -> Self {
        Self {
            phase: Some(phase),
            status,
            message: message.into(),
            counts: None,
            done: false,
        }
    }

    pub fn with_counts(mut self, counts: Option<SectionCounts>) -> Self {
        self.counts = counts;
        self
    }
}

// =============================================================================
// Reporters
// =============================================================================

pub trait StatusReporter: Send + Sync {
    fn report(&self, event: &StatusEvent);
}

pub type SharedReporter = Arc<dyn StatusReporter>;

/// Structured log output
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn report(&self, event: &StatusEvent) {
        let phase = event.phase.map(|p| p.key()).unwrap_or("run");
        let counts = event.counts.map(|c| c.to_string()).unwrap_or_default();
        match event.status {
            PhaseStatus::Failed | PhaseStatus::Degraded => warn!(
                phase,
                status = %event.status,
                counts = %counts,
                done = event.done,
                "{}",
                event.message
            ),
            _ => info!(
                phase,
                status = %event.status,
                counts = %counts,
                done = event.done,
                "{}",
                event.message
            ),
        }
    }
}

/// Fans events out over a tokio broadcast channel
pub struct BroadcastReporter {
    sender: broadcast::Sender<StatusEvent>,
}

impl BroadcastReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for BroadcastReporter {
    fn report(&self, event: &StatusEvent) {
        // No receivers is normal when nothing is attached
        let _ = self.sender.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reporter_delivers_to_subscribers() {
        let reporter = BroadcastReporter::new();
        reporter.report(&StatusEvent::run(PhaseStatus::Running, "nobody listening", false));

        let mut rx = reporter.subscribe();
        reporter.report(&StatusEvent::phase(Phase::Plan, PhaseStatus::Succeeded, "planned"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.phase, Some(Phase::Plan));
        assert_eq!(event.status, PhaseStatus::Succeeded);
    }

    #[test]
    fn test_status_usability() {
        assert!(PhaseStatus::Cached.is_usable());
        assert!(PhaseStatus::Degraded.is_usable());
        assert!(!PhaseStatus::Failed.is_usable());
        assert!(!PhaseStatus::Skipped.is_usable());
        assert!(!PhaseStatus::Running.is_terminal());
    }

    #[test]
    fn test_counts_display() {
        let counts = SectionCounts {
            succeeded: 4,
            recovered: 1,
            failed: 1,
            skipped: 0,
        };
        assert_eq!(counts.to_string(), "4 ok (1 recovered), 1 failed");
        assert_eq!(counts.total(), 5);
    }
}

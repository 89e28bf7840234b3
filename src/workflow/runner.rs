//! Cache-Aware Phase Execution
//!
//! Runs a phase's generator at most once per run: a persisted artifact is
//! returned as-is, a fresh one is persisted only after it fully succeeds.

use std::future::Future;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::storage::{Artifact, SharedCheckpointStore, fingerprint};
use crate::types::{QuillError, Result, RunId};

use super::Phase;

/// Outcome of one phase execution
#[derive(Debug)]
pub enum PhaseOutcome<T> {
    /// Loaded from the checkpoint store
    Cached(T),
    /// Generated and persisted
    Succeeded(T),
    /// Generation failed; nothing persisted
    Failed(QuillError),
}

impl<T> PhaseOutcome<T> {
    pub fn artifact(&self) -> Option<&T> {
        match self {
            Self::Cached(a) | Self::Succeeded(a) => Some(a),
            Self::Failed(_) => None,
        }
    }

    pub fn into_artifact(self) -> Option<T> {
        match self {
            Self::Cached(a) | Self::Succeeded(a) => Some(a),
            Self::Failed(_) => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

#[derive(Clone)]
pub struct PhaseRunner {
    store: SharedCheckpointStore,
    invalidate_on_input_change: bool,
}

impl PhaseRunner {
    pub fn new(store: SharedCheckpointStore) -> Self {
        Self {
            store,
            invalidate_on_input_change: false,
        }
    }

    /// Regenerate instead of reusing when the recorded input fingerprint differs
    pub fn with_invalidation(mut self, enabled: bool) -> Self {
        self.invalidate_on_input_change = enabled;
        self
    }

    pub fn store(&self) -> &SharedCheckpointStore {
        &self.store
    }

    /// Run one phase
    ///
    /// Storage failures are returned as `Err`; generator failures become
    /// [`PhaseOutcome::Failed`].
    pub async fn run<I, T, F, Fut>(
        &self,
        run: &RunId,
        phase: Phase,
        input: &I,
        generate: F,
    ) -> Result<PhaseOutcome<T>>
    where
        I: Serialize + ?Sized,
        T: Artifact,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let input_fingerprint = fingerprint(input)?;

        if let Some(stored) = self.store.get_stored::<T>(run, phase)? {
            if stored.input_fingerprint == input_fingerprint {
                debug!(run = %run, phase = %phase, "Using cached artifact");
                return Ok(PhaseOutcome::Cached(stored.artifact));
            }

            if !self.invalidate_on_input_change {
                warn!(
                    run = %run,
                    phase = %phase,
                    saved_at = %stored.saved_at,
                    "Phase input changed since checkpoint was saved; reusing cached artifact"
                );
                return Ok(PhaseOutcome::Cached(stored.artifact));
            }

            info!(run = %run, phase = %phase, "Phase input changed; discarding checkpoint");
            self.store.clear(run, Some(phase))?;
        }

        match generate().await {
            Ok(artifact) => {
                self.store.put(run, phase, &artifact, &input_fingerprint)?;
                Ok(PhaseOutcome::Succeeded(artifact))
            }
            Err(e) if e.is_storage() => Err(e),
            Err(e) => {
                debug!(run = %run, phase = %phase, error = %e, "Phase generation failed");
                Ok(PhaseOutcome::Failed(e))
            }
        }
    }
}

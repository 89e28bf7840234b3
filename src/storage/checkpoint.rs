//! Checkpoint Store
//!
//! Typed persistence of one artifact per (run, phase) on top of a raw
//! [`CheckpointBackend`]. Every record is a self-describing JSON envelope.
//!
//! ## Read semantics
//!
//! - Backend I/O failure: `Err(StorageIo)`
//! - Unparseable record, envelope mismatch or checksum mismatch: logged as cache
//!   corruption and reported as absent (`Ok(None)`)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants::storage::SCHEMA_VERSION;
use crate::types::{
    ArticlePlan, FinalArticle, QuillError, ResearchNotes, Result, RunId, SynthesizedArticle,
};
use crate::workflow::Phase;

use super::CheckpointBackend;

// =============================================================================
// Artifact Types
// =============================================================================

/// A phase artifact that can be persisted
pub trait Artifact: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Payload type name recorded in the envelope
    const KIND: &'static str;
}

impl Artifact for ArticlePlan {
    const KIND: &'static str = "article_plan";
}

impl Artifact for ResearchNotes {
    const KIND: &'static str = "research_notes";
}

impl Artifact for SynthesizedArticle {
    const KIND: &'static str = "synthesized_article";
}

impl Artifact for FinalArticle {
    const KIND: &'static str = "final_article";
}

// =============================================================================
// Envelope
// =============================================================================

/// Persisted record layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub version: u32,
    pub run_id: String,
    pub phase: Phase,
    pub payload_type: String,
    /// SHA-256 of the serialized phase input
    pub input_fingerprint: String,
    /// CRC32 of the serialized payload
    pub checksum: u32,
    pub saved_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl ArtifactEnvelope {
    fn seal<T: Artifact>(run: &RunId, phase: Phase, artifact: &T, fingerprint: &str) -> Result<Self> {
        let payload = serde_json::to_value(artifact)?;
        let checksum = payload_checksum(&payload)?;
        Ok(Self {
            version: SCHEMA_VERSION,
            run_id: run.as_str().to_string(),
            phase,
            payload_type: T::KIND.to_string(),
            input_fingerprint: fingerprint.to_string(),
            checksum,
            saved_at: Utc::now(),
            payload,
        })
    }

    /// Check the envelope belongs to this key and type and is intact
    fn verify<T: Artifact>(&self, run: &RunId, phase: Phase) -> std::result::Result<(), String> {
        if self.version != SCHEMA_VERSION {
            return Err(format!(
                "schema version {} (expected {})",
                self.version, SCHEMA_VERSION
            ));
        }
        if self.run_id != run.as_str() {
            return Err(format!("record belongs to run '{}'", self.run_id));
        }
        if self.phase != phase {
            return Err(format!("record belongs to phase '{}'", self.phase));
        }
        if self.payload_type != T::KIND {
            return Err(format!(
                "payload type '{}' (expected '{}')",
                self.payload_type,
                T::KIND
            ));
        }
        let actual = payload_checksum(&self.payload).map_err(|e| e.to_string())?;
        if actual != self.checksum {
            return Err(format!(
                "checksum mismatch (stored {:08x}, computed {:08x})",
                self.checksum, actual
            ));
        }
        Ok(())
    }
}

fn payload_checksum(payload: &serde_json::Value) -> Result<u32> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(crc32fast::hash(&bytes))
}

/// SHA-256 hex digest of a serialized phase input
pub fn fingerprint<T: Serialize + ?Sized>(input: &T) -> Result<String> {
    let bytes = serde_json::to_vec(input)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Artifact read back together with its envelope metadata
#[derive(Debug, Clone)]
pub struct StoredArtifact<T> {
    pub artifact: T,
    pub input_fingerprint: String,
    pub saved_at: DateTime<Utc>,
}

// =============================================================================
// Store
// =============================================================================

pub type SharedCheckpointStore = Arc<CheckpointStore>;

pub struct CheckpointStore {
    backend: Arc<dyn CheckpointBackend>,
}

impl CheckpointStore {
    pub fn new(backend: Arc<dyn CheckpointBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Persist an artifact atomically, replacing any previous record for the key
    pub fn put<T: Artifact>(
        &self,
        run: &RunId,
        phase: Phase,
        artifact: &T,
        input_fingerprint: &str,
    ) -> Result<()> {
        let envelope = ArtifactEnvelope::seal(run, phase, artifact, input_fingerprint)?;
        let record = serde_json::to_string_pretty(&envelope)?;
        self.backend.write(run, phase, &record)?;
        debug!(run = %run, phase = %phase, kind = T::KIND, "Checkpoint saved");
        Ok(())
    }

    /// Load an artifact; corrupt records read as absent
    pub fn get<T: Artifact>(&self, run: &RunId, phase: Phase) -> Result<Option<T>> {
        Ok(self.get_stored(run, phase)?.map(|stored| stored.artifact))
    }

    /// Load an artifact with its fingerprint and timestamp
    pub fn get_stored<T: Artifact>(
        &self,
        run: &RunId,
        phase: Phase,
    ) -> Result<Option<StoredArtifact<T>>> {
        let Some(record) = self.backend.read(run, phase)? else {
            debug!(run = %run, phase = %phase, "Checkpoint miss");
            return Ok(None);
        };

        match Self::decode::<T>(run, phase, &record) {
            Ok(stored) => {
                debug!(run = %run, phase = %phase, "Checkpoint hit");
                Ok(Some(stored))
            }
            Err(e) => {
                warn!("{}; treating as cache miss", e);
                Ok(None)
            }
        }
    }

    fn decode<T: Artifact>(run: &RunId, phase: Phase, record: &str) -> Result<StoredArtifact<T>> {
        let corruption = |reason: String| QuillError::CacheCorruption {
            run: run.to_string(),
            phase: phase.to_string(),
            reason,
        };

        let envelope: ArtifactEnvelope =
            serde_json::from_str(record).map_err(|e| corruption(e.to_string()))?;
        envelope.verify::<T>(run, phase).map_err(corruption)?;

        let artifact = serde_json::from_value::<T>(envelope.payload)
            .map_err(|e| corruption(format!("payload does not match {}: {}", T::KIND, e)))?;

        Ok(StoredArtifact {
            artifact,
            input_fingerprint: envelope.input_fingerprint,
            saved_at: envelope.saved_at,
        })
    }

    pub fn exists(&self, run: &RunId, phase: Phase) -> Result<bool> {
        self.backend.contains(run, phase)
    }

    /// Remove one phase, or every phase of the run; returns the number removed
    pub fn clear(&self, run: &RunId, phase: Option<Phase>) -> Result<usize> {
        let removed = match phase {
            Some(phase) => usize::from(self.backend.remove(run, phase)?),
            None => self.backend.remove_run(run)?,
        };
        debug!(run = %run, phase = ?phase, removed, "Checkpoints cleared");
        Ok(removed)
    }

    /// Phases with a persisted record, in pipeline order
    pub fn cached_phases(&self, run: &RunId) -> Result<Vec<Phase>> {
        let mut phases = self.backend.phases(run)?;
        phases.sort();
        phases.dedup();
        Ok(phases)
    }

    /// Runs with at least one persisted record
    pub fn runs(&self) -> Result<Vec<RunId>> {
        self.backend.runs()
    }
}

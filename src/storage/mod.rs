//! Checkpoint Persistence
//!
//! Raw key/value backends for phase records plus the typed [`CheckpointStore`].
//! Backends only move opaque records; envelope handling lives in the store.

pub mod checkpoint;
pub mod fs_store;
pub mod memory_store;
pub mod sqlite_store;

use std::sync::Arc;

use crate::config::{StorageBackendKind, StorageConfig};
use crate::constants::storage::SQLITE_FILE;
use crate::types::{Result, RunId};
use crate::workflow::Phase;

pub use checkpoint::{
    Artifact, ArtifactEnvelope, CheckpointStore, SharedCheckpointStore, StoredArtifact,
    fingerprint,
};
pub use fs_store::FsBackend;
pub use memory_store::MemoryBackend;
pub use sqlite_store::{PoolConfig, SqliteBackend};

/// Keyed record persistence, one record per (run, phase)
///
/// Writes must be atomic per key. I/O failures surface as `StorageIo`.
pub trait CheckpointBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or replace the record for a key
    fn write(&self, run: &RunId, phase: Phase, record: &str) -> Result<()>;

    fn read(&self, run: &RunId, phase: Phase) -> Result<Option<String>>;

    fn contains(&self, run: &RunId, phase: Phase) -> Result<bool> {
        Ok(self.read(run, phase)?.is_some())
    }

    /// Returns whether a record was removed
    fn remove(&self, run: &RunId, phase: Phase) -> Result<bool>;

    /// Remove every record of a run; returns the number removed
    fn remove_run(&self, run: &RunId) -> Result<usize> {
        let mut removed = 0;
        for phase in Phase::ALL {
            if self.remove(run, phase)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn phases(&self, run: &RunId) -> Result<Vec<Phase>>;

    fn runs(&self) -> Result<Vec<RunId>>;
}

/// Open the backend selected by configuration
pub fn open_backend(config: &StorageConfig) -> Result<Arc<dyn CheckpointBackend>> {
    let backend: Arc<dyn CheckpointBackend> = match config.backend {
        StorageBackendKind::Fs => Arc::new(FsBackend::new(&config.data_dir)),
        StorageBackendKind::Sqlite => {
            std::fs::create_dir_all(&config.data_dir)?;
            let backend = SqliteBackend::open(config.data_dir.join(SQLITE_FILE))?;
            backend.initialize()?;
            Arc::new(backend)
        }
        StorageBackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    tracing::debug!(backend = backend.name(), dir = %config.data_dir.display(), "Storage opened");
    Ok(backend)
}

/// Open the configured backend wrapped in a shared store
pub fn open_store(config: &StorageConfig) -> Result<SharedCheckpointStore> {
    Ok(Arc::new(CheckpointStore::new(open_backend(config)?)))
}

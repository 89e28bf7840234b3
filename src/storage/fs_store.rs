//! Filesystem Backend
//!
//! Layout: `<data_dir>/<run>/<phase>.json`. Writes go to a temp file in the
//! same directory and are renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::types::{Result, RunId, StorageResultExt};
use crate::workflow::Phase;

use super::CheckpointBackend;

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run: &RunId) -> PathBuf {
        self.root.join(run.as_str())
    }

    fn record_path(&self, run: &RunId, phase: Phase) -> PathBuf {
        self.run_dir(run).join(format!("{}.json", phase.key()))
    }

    /// Remove the run directory when nothing is left in it
    fn prune_run_dir(&self, run: &RunId) {
        let dir = self.run_dir(run);
        let empty = fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if empty && let Err(e) = fs::remove_dir(&dir) {
            tracing::debug!("Could not remove empty run dir {}: {}", dir.display(), e);
        }
    }
}

impl CheckpointBackend for FsBackend {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn write(&self, run: &RunId, phase: Phase, record: &str) -> Result<()> {
        let dir = self.run_dir(run);
        fs::create_dir_all(&dir).storage_context("create run directory")?;

        let target = self.record_path(run, phase);
        let tmp = dir.join(format!(".{}.{}.tmp", phase.key(), uuid::Uuid::new_v4()));
        fs::write(&tmp, record).storage_context("write checkpoint")?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(crate::types::QuillError::storage("rename checkpoint", e));
        }
        Ok(())
    }

    fn read(&self, run: &RunId, phase: Phase) -> Result<Option<String>> {
        match fs::read_to_string(self.record_path(run, phase)) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // Non-UTF-8 bytes are corruption, not an I/O failure
            Err(e) if e.kind() == ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(e) => Err(crate::types::QuillError::storage("read checkpoint", e)),
        }
    }

    fn contains(&self, run: &RunId, phase: Phase) -> Result<bool> {
        self.record_path(run, phase)
            .try_exists()
            .storage_context("stat checkpoint")
    }

    fn remove(&self, run: &RunId, phase: Phase) -> Result<bool> {
        let removed = match fs::remove_file(self.record_path(run, phase)) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(crate::types::QuillError::storage("remove checkpoint", e)),
        };
        if removed {
            self.prune_run_dir(run);
        }
        Ok(removed)
    }

    fn phases(&self, run: &RunId) -> Result<Vec<Phase>> {
        let entries = match fs::read_dir(self.run_dir(run)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(crate::types::QuillError::storage("list checkpoints", e)),
        };

        let mut phases = Vec::new();
        for entry in entries {
            let entry = entry.storage_context("list checkpoints")?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(phase) = stem.parse::<Phase>() {
                phases.push(phase);
            }
        }
        Ok(phases)
    }

    fn runs(&self) -> Result<Vec<RunId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(crate::types::QuillError::storage("list runs", e)),
        };

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.storage_context("list runs")?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(run) = entry.file_name().to_str().and_then(RunId::parse)
                && !self.phases(&run)?.is_empty()
            {
                runs.push(run);
            }
        }
        runs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsBackend, RunId) {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path());
        (dir, backend, RunId::from_title("Async Rust"))
    }

    #[test]
    fn test_layout_and_atomic_write() {
        let (dir, backend, run) = setup();
        backend.write(&run, Phase::Plan, "{}").unwrap();
        backend.write(&run, Phase::Plan, "{\"v\":2}").unwrap();

        let path = dir.path().join("async-rust").join("plan.json");
        assert_eq!(fs::read_to_string(path).unwrap(), "{\"v\":2}");

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("async-rust"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_read_missing_is_none() {
        let (_dir, backend, run) = setup();
        assert!(backend.read(&run, Phase::Research).unwrap().is_none());
        assert!(!backend.contains(&run, Phase::Research).unwrap());
        assert!(backend.phases(&run).unwrap().is_empty());
    }

    #[test]
    fn test_clearing_all_phases_removes_run_dir() {
        let (dir, backend, run) = setup();
        backend.write(&run, Phase::Plan, "{}").unwrap();
        backend.write(&run, Phase::Research, "{}").unwrap();
        assert_eq!(backend.runs().unwrap(), vec![run.clone()]);

        assert_eq!(backend.remove_run(&run).unwrap(), 2);
        assert!(!dir.path().join("async-rust").exists());
        assert!(backend.runs().unwrap().is_empty());
    }

    #[test]
    fn test_run_dir_kept_when_other_files_remain() {
        let (dir, backend, run) = setup();
        backend.write(&run, Phase::Plan, "{}").unwrap();
        fs::write(dir.path().join("async-rust").join("article.md"), "# A").unwrap();

        assert!(backend.remove(&run, Phase::Plan).unwrap());
        assert!(dir.path().join("async-rust").exists());
    }

    #[test]
    fn test_write_into_unwritable_root_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        let backend = FsBackend::new(&file);

        let err = backend
            .write(&RunId::from_title("x"), Phase::Plan, "{}")
            .unwrap_err();
        assert!(err.is_storage());
    }
}

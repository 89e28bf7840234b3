//! In-memory backend for tests and throwaway runs.

use dashmap::DashMap;

use crate::types::{Result, RunId};
use crate::workflow::Phase;

use super::CheckpointBackend;

#[derive(Default)]
pub struct MemoryBackend {
    records: DashMap<(String, Phase), String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CheckpointBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, run: &RunId, phase: Phase, record: &str) -> Result<()> {
        self.records
            .insert((run.as_str().to_string(), phase), record.to_string());
        Ok(())
    }

    fn read(&self, run: &RunId, phase: Phase) -> Result<Option<String>> {
        Ok(self
            .records
            .get(&(run.as_str().to_string(), phase))
            .map(|r| r.value().clone()))
    }

    fn remove(&self, run: &RunId, phase: Phase) -> Result<bool> {
        Ok(self
            .records
            .remove(&(run.as_str().to_string(), phase))
            .is_some())
    }

    fn phases(&self, run: &RunId) -> Result<Vec<Phase>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.key().0 == run.as_str())
            .map(|entry| entry.key().1)
            .collect())
    }

    fn runs(&self) -> Result<Vec<RunId>> {
        let mut runs: Vec<RunId> = self
            .records
            .iter()
            .filter_map(|entry| RunId::parse(&entry.key().0))
            .collect();
        runs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        runs.dedup();
        Ok(runs)
    }
}

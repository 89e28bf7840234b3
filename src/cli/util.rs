//! CLI Common Utilities
//!
//! Shared configuration loading and run resolution for command handlers.

use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigLoader};
use crate::constants::storage::ARTICLE_FILE;
use crate::storage::{SharedCheckpointStore, open_store};
use crate::types::{QuillError, Result, RunId};

/// Command execution context
///
/// Loaded once per invocation; commands that only touch configuration use
/// [`ConfigLoader`] directly instead.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub store: SharedCheckpointStore,
}

impl CommandContext {
    /// Load configuration (optionally from an explicit file) and open storage
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = ConfigLoader::load_with(config_path)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let store = open_store(&config.storage)?;
        Ok(Self { config, store })
    }

    /// Default location of a run's rendered article
    pub fn article_path(&self, run: &RunId) -> PathBuf {
        self.config
            .storage
            .data_dir
            .join(run.as_str())
            .join(ARTICLE_FILE)
    }
}

/// Accept either a run id or the article title it was derived from
pub fn resolve_run(raw: &str) -> Result<RunId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QuillError::Config("Run id or title is required".to_string()));
    }
    Ok(RunId::parse(raw).unwrap_or_else(|| RunId::from_title(raw)))
}

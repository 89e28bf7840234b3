//! Configuration Types
//!
//! All configuration structures with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{fetch, research, retry, search, storage, synthesis};
use crate::types::{QuillError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider settings
    pub llm: LlmConfig,

    /// Search API settings
    pub search: SearchConfig,

    /// Page fetching settings (augment phase)
    pub fetch: FetchConfig,

    /// Phase execution settings
    pub pipeline: PipelineConfig,

    /// Checkpoint persistence settings
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `QuillError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(QuillError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(QuillError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.fetch.timeout_secs == 0 || self.search.timeout_secs == 0 {
            return Err(QuillError::Config(
                "fetch and search timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_retries == 0 {
            return Err(QuillError::Config(
                "pipeline.max_retries must be at least 1".to_string(),
            ));
        }

        if self.pipeline.research_concurrency == 0
            || self.pipeline.synthesis_concurrency == 0
            || self.fetch.concurrency == 0
        {
            return Err(QuillError::Config(
                "concurrency limits must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.retry_max_delay_ms < self.pipeline.retry_min_delay_ms {
            return Err(QuillError::Config(format!(
                "pipeline.retry_max_delay_ms ({}) is below retry_min_delay_ms ({})",
                self.pipeline.retry_max_delay_ms, self.pipeline.retry_min_delay_ms
            )));
        }

        if self.search.results_per_query == 0 {
            return Err(QuillError::Config(
                "search.results_per_query must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (only "openai" and compatible endpoints)
    pub provider: String,

    /// Model name
    pub model: String,

    /// Custom endpoint for OpenAI-compatible APIs
    pub api_base: Option<String>,

    /// API key; falls back to `OPENAI_API_KEY`. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate per call
    pub max_tokens: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

// =============================================================================
// Search Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_base: String,

    /// API key; falls back to `SERPER_API_KEY`. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Hits requested per research query
    pub results_per_query: usize,

    pub timeout_secs: u64,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("results_per_query", &self.results_per_query)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: search::DEFAULT_API_BASE.to_string(),
            api_key: None,
            results_per_query: search::DEFAULT_RESULTS_PER_QUERY,
            timeout_secs: search::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Fetch Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,

    /// Maximum pages fetched at once
    pub concurrency: usize,

    /// Cleaned pages shorter than this are discarded
    pub min_content_chars: usize,

    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: fetch::DEFAULT_TIMEOUT_SECS,
            concurrency: fetch::DEFAULT_CONCURRENCY,
            min_content_chars: fetch::MIN_CONTENT_CHARS,
            user_agent: fetch::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ordinary research attempts per section before recovery
    pub max_retries: u32,

    pub research_concurrency: usize,

    pub synthesis_concurrency: usize,

    /// Backoff between research attempts
    pub retry_min_delay_ms: u64,
    pub retry_max_delay_ms: u64,

    /// Run the optional augment phase
    pub augment: bool,

    /// Run the optional enhance phase
    pub enhance: bool,

    /// Treat a section with queries but zero findings as a failed attempt
    pub empty_research_is_failure: bool,

    /// Regenerate a checkpoint whose recorded input no longer matches
    pub invalidate_on_input_change: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: research::DEFAULT_MAX_RETRIES,
            research_concurrency: research::DEFAULT_CONCURRENCY,
            synthesis_concurrency: synthesis::DEFAULT_CONCURRENCY,
            retry_min_delay_ms: retry::MIN_DELAY_MS,
            retry_max_delay_ms: retry::MAX_DELAY_MS,
            augment: true,
            enhance: true,
            empty_research_is_failure: true,
            invalidate_on_input_change: false,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// One JSON file per (run, phase)
    #[default]
    Fs,
    /// Single SQLite database
    Sqlite,
    /// Process-local; nothing survives exit
    Memory,
}

impl std::fmt::Display for StorageBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendKind::Fs => write!(f, "fs"),
            StorageBackendKind::Sqlite => write!(f, "sqlite"),
            StorageBackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fs" | "file" => Ok(StorageBackendKind::Fs),
            "sqlite" => Ok(StorageBackendKind::Sqlite),
            "memory" => Ok(StorageBackendKind::Memory),
            _ => Err(format!(
                "Unknown storage backend: {}. Valid values: fs, sqlite, memory",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,

    /// Root for checkpoints and rendered articles
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            data_dir: PathBuf::from(storage::DEFAULT_DATA_DIR),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

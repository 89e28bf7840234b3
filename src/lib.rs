//! Quillwork - Research-Backed Article Writer
//!
//! Turns a title and description into a finished blog article through six
//! checkpointed phases: plan, research, augment, synthesize, finalize, enhance.
//!
//! ## Core Features
//!
//! - **Resumable Runs**: every phase artifact is persisted per run, so an
//!   interrupted run continues from the first missing phase
//! - **Section Fan-out**: research and synthesis run per section with bounded
//!   concurrency; failed sections are contained instead of ending the run
//! - **Research Recovery**: sections whose searches keep failing get new
//!   queries proposed by the model before they are given up
//! - **Pluggable Storage**: filesystem, SQLite, or in-memory checkpoints
//!
//! ## Quick Start
//!
//! ```ignore
//! use quillwork::{ArticleRequest, ConfigLoader, WorkflowOrchestrator};
//!
//! let config = ConfigLoader::load()?;
//! let provider = quillwork::ai::create_provider(&config.llm)?;
//! let fetcher = Arc::new(WebFetcher::new(&config.search, &config.fetch)?);
//! let generator = Arc::new(LlmGenerator::new(provider, fetcher.clone()));
//! let orchestrator = WorkflowOrchestrator::new(
//!     generator,
//!     fetcher,
//!     quillwork::storage::open_store(&config.storage)?,
//!     config.pipeline.clone(),
//!     &config.fetch,
//! );
//! let report = orchestrator.run(&ArticleRequest::new("Async Rust", "A practical guide")).await;
//! ```
//!
//! ## Modules
//!
//! - [`workflow`]: phase sequencing, retry and recovery, status events
//! - [`ai`]: LLM provider abstraction and the prompt-driven generator
//! - [`fetch`]: web search and page retrieval
//! - [`storage`]: checkpoint envelopes over pluggable backends
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod fetch;
pub mod storage;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, PipelineConfig, StorageBackendKind};

// Error Types
pub use types::error::{ErrorCategory, QuillError, Result};

// Domain
pub use types::{ArticlePlan, ArticleRequest, FinalArticle, ResearchNotes, RunId};

// Storage
pub use storage::{CheckpointBackend, CheckpointStore, SharedCheckpointStore};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use workflow::{
    Phase, PhaseStatus, RunOutcome, RunReport, StatusEvent, StatusReporter, WorkflowOrchestrator,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{Generator, LlmGenerator, LlmProvider, SharedGenerator, create_provider};
pub use fetch::{ContentFetcher, SharedFetcher, WebFetcher};

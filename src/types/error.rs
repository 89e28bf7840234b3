//! Unified Error Type System
//!
//! Centralized error types for the whole pipeline.
//!
//! ## Containment
//!
//! - **Section-level** errors (`Llm`, `RecoveryExhausted`, `Fetch`) are contained at the
//!   section boundary and turned into placeholder data plus counts.
//! - **Optional-phase** errors degrade to pass-through of the upstream artifact.
//! - **Required-phase** errors terminate the run and are folded into the run report.
//! - **Storage** errors (`StorageIo`) always propagate: they threaten resumability.
//! - **Cache corruption** never escapes the checkpoint store; it becomes a cache miss.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Classification of a failed generation call, used for retry decisions and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited by the API
    RateLimit,
    /// Connectivity problem or request timeout
    Network,
    /// Temporary server-side failure
    Transient,
    /// Response could not be parsed into the expected shape
    ParseError,
    /// Credentials rejected
    Auth,
    /// Request rejected as malformed
    BadRequest,
    /// Endpoint or model not available
    Unavailable,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether repeating the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError | Self::Unknown
        )
    }

    /// Map an HTTP status code to a category
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            401 | 403 => Self::Auth,
            400 | 422 => Self::BadRequest,
            404 => Self::Unavailable,
            408 => Self::Network,
            500..=599 => Self::Transient,
            _ => Self::Unknown,
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Failed generation call with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "[{}:{}] {}", provider, self.category, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    /// Add provider context
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn is_transient(&self) -> bool {
        self.category.is_transient()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation failure for records checked at the pipeline boundary
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub field: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)
        } else {
            write!(f, "Validation failed: {}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required content is missing or empty
    MissingField,
    /// Two records share an identifier
    Duplicate,
    /// Value out of range
    Range,
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum QuillError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Generation Errors
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Fetch failed for {target}: {message}")]
    Fetch { target: String, message: String },

    // -------------------------------------------------------------------------
    // Section Errors
    // -------------------------------------------------------------------------
    #[error("Section {section_id} failed after {attempts} attempts: {reason}")]
    RecoveryExhausted {
        section_id: u32,
        attempts: u32,
        reason: String,
    },

    #[error("No sections researched ({failed} failed)")]
    NoSectionsResearched { failed: usize },

    #[error("No sections synthesized ({failed} failed, {skipped} skipped)")]
    NoSectionsSynthesized { failed: usize, skipped: usize },

    #[error("Phase {phase} produced no usable output: {reason}")]
    EmptyOutcome { phase: String, reason: String },

    // -------------------------------------------------------------------------
    // Checkpoint Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt checkpoint {run}/{phase}: {reason}")]
    CacheCorruption {
        run: String,
        phase: String,
        reason: String,
    },

    #[error("Storage I/O error during {operation}: {message}")]
    StorageIo {
        operation: &'static str,
        message: String,
    },

    #[error("Phase {phase} requires the {dependency} artifact, which is missing")]
    MissingDependency { phase: String, dependency: String },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<LlmError> for QuillError {
    fn from(err: LlmError) -> Self {
        QuillError::Llm(err)
    }
}

impl From<ValidationError> for QuillError {
    fn from(err: ValidationError) -> Self {
        QuillError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, QuillError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl QuillError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn storage(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::StorageIo {
            operation,
            message: err.to_string(),
        }
    }

    pub fn llm(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self::Llm(LlmError::new(category, message))
    }

    pub fn fetch(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Whether a retry with the same input may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_transient(),
            Self::Timeout { .. } | Self::Fetch { .. } | Self::Json(_) => true,
            Self::EmptyOutcome { .. } => true,
            _ => false,
        }
    }

    /// Whether this error threatens resumability and must abort the phase
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageIo { .. })
    }
}

/// Context extension for foreign errors that belong to the storage layer
pub trait StorageResultExt<T> {
    fn storage_context(self, operation: &'static str) -> Result<T>;
}

impl<T, E: std::fmt::Display> StorageResultExt<T> for std::result::Result<T, E> {
    fn storage_context(self, operation: &'static str) -> Result<T> {
        self.map_err(|e| QuillError::storage(operation, e))
    }
}

// =============================================================================
// Tests
// =============================================================================

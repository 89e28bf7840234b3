//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Article defaults
pub mod article {
    /// Default target length when the request does not specify one
    pub const DEFAULT_TARGET_WORDS: u32 = 1000;

    /// Maximum run id length (characters)
    pub const MAX_RUN_ID_LEN: usize = 80;

    /// Run id used when the title has no usable characters
    pub const FALLBACK_RUN_ID: &str = "untitled";
}

/// Research phase constants
pub mod research {
    /// Default ordinary attempts per section before recovery
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Failure cause length kept in placeholder summaries
    pub const FAILURE_SUMMARY_CHARS: usize = 200;

    /// Summary used when a section has no research queries
    pub const NO_QUERIES_SUMMARY: &str = "No research queries provided for this section";

    /// Default concurrent sections
    pub const DEFAULT_CONCURRENCY: usize = 3;
}

/// Synthesis phase constants
pub mod synthesis {
    /// Default concurrent sections
    pub const DEFAULT_CONCURRENCY: usize = 4;

    /// Scraped content characters per finding included in a synthesis prompt
    pub const MAX_FINDING_CHARS: usize = 4_000;
}

/// Generator call budget
pub mod generation {
    /// Upper bound on one generator call, search fan-out included (seconds)
    pub const CALL_TIMEOUT_SECS: u64 = 600;
}

/// Retry backoff constants
pub mod retry {
    /// Base delay for exponential backoff (milliseconds)
    pub const MIN_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (milliseconds)
    pub const MAX_DELAY_MS: u64 = 10_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Page fetching constants
pub mod fetch {
    /// Pages at or below this many characters after cleaning are discarded
    pub const MIN_CONTENT_CHARS: usize = 100;

    /// Default concurrent page fetches
    pub const DEFAULT_CONCURRENCY: usize = 5;

    /// Default page fetch timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

    /// Maximum characters kept per fetched page
    pub const MAX_PAGE_CHARS: usize = 20_000;

    /// Document extensions that are never fetched
    pub const DOCUMENT_EXTENSIONS: &[&str] =
        &[".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx"];

    pub const DEFAULT_USER_AGENT: &str = concat!("quillwork/", env!("CARGO_PKG_VERSION"));
}

/// Search API constants
pub mod search {
    pub const DEFAULT_API_BASE: &str = "https://google.serper.dev";

    /// Results requested per query
    pub const DEFAULT_RESULTS_PER_QUERY: usize = 5;

    /// Default search timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

/// Checkpoint storage constants
pub mod storage {
    /// Envelope schema version; bump when artifact layouts change incompatibly
    pub const SCHEMA_VERSION: u32 = 1;

    /// SQLite database file name inside the data directory
    pub const SQLITE_FILE: &str = "checkpoints.db";

    /// Default data directory (relative to the working directory)
    pub const DEFAULT_DATA_DIR: &str = "data";

    /// Rendered article file name inside a run directory
    pub const ARTICLE_FILE: &str = "article.md";
}

/// HTTP/Network constants
pub mod network {
    /// Default LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}

/// Status channel constants
pub mod status {
    /// Broadcast channel capacity for status events
    pub const CHANNEL_CAPACITY: usize = 64;
}

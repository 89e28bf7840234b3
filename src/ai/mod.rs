//! AI Integration Layer
//!
//! LLM provider abstraction plus the generator that turns phase inputs into
//! prompts and parses structured responses back into artifacts.

pub mod generator;
pub mod json;
pub mod prompt;
pub mod provider;
pub mod timeout;

pub use generator::{Generator, LlmGenerator, RecoveredQueries, SharedGenerator};
pub use json::extract_json;
pub use prompt::PromptBuilder;
pub use provider::{
    LlmProvider, LlmResponse, OpenAiProvider, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::with_timeout;

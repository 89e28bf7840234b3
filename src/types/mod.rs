pub mod article;
pub mod error;
pub mod run_id;

pub use article::{
    ArticleBrief, ArticlePlan, ArticleRequest, FinalArticle, ResearchNotes, SectionFinding,
    SectionId, SectionPlan, SectionResearchRecord, SynthesizedArticle, SynthesizedSection,
};
pub use error::{
    ErrorCategory, LlmError, QuillError, Result, StorageResultExt, ValidationError,
    ValidationErrorKind,
};
pub use run_id::RunId;

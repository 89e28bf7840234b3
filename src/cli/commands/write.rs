//! Write Command
//!
//! Runs (or resumes) the article pipeline for one title and writes the final
//! markdown to disk.
//!
//! Usage:
//!   quillwork write "Title" -d "Description" [-n 1500] [--layout file]
//!                   [--fresh] [--output path] [--no-augment] [--no-enhance]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::info;

use crate::ai::{LlmGenerator, create_provider};
use crate::cli::ui::{ConsoleReporter, Output};
use crate::cli::util::CommandContext;
use crate::config::PipelineConfig;
use crate::constants::generation::CALL_TIMEOUT_SECS;
use crate::fetch::{SharedFetcher, WebFetcher};
use crate::types::{ArticleRequest, QuillError, Result, RunId};
use crate::workflow::{RunReport, WorkflowOrchestrator};

/// Write command options (consolidated parameters)
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub title: String,
    pub description: String,
    pub target_words: Option<u32>,
    /// File holding a fixed section layout
    pub layout: Option<PathBuf>,
    /// Clear cached phases before running
    pub fresh: bool,
    pub output: Option<PathBuf>,
    pub no_augment: bool,
    pub no_enhance: bool,
}

impl WriteOptions {
    pub fn request(&self) -> Result<ArticleRequest> {
        if self.title.trim().is_empty() {
            return Err(QuillError::Config("Article title must not be empty".to_string()));
        }

        let mut request = ArticleRequest::new(self.title.trim(), self.description.trim());
        if let Some(words) = self.target_words {
            if words == 0 {
                return Err(QuillError::Config("Target length must be positive".to_string()));
            }
            request = request.with_target_words(words);
        }
        if let Some(path) = &self.layout {
            let layout = std::fs::read_to_string(path)?;
            if !layout.trim().is_empty() {
                request = request.with_layout(layout);
            }
        }
        Ok(request)
    }

    /// Pipeline configuration with command-line switches applied
    pub fn pipeline(&self, base: &PipelineConfig) -> PipelineConfig {
        let mut config = base.clone();
        if self.no_augment {
            config.augment = false;
        }
        if self.no_enhance {
            config.enhance = false;
        }
        config
    }
}

/// Run the pipeline with real providers
pub fn run(ctx: CommandContext, options: WriteOptions, output: Output) -> Result<RunReport> {
    let request = options.request()?;
    let config = &ctx.config;

    let provider = create_provider(&config.llm)?;
    info!("Using LLM provider: {} ({})", provider.name(), provider.model());

    let fetcher: SharedFetcher = Arc::new(WebFetcher::new(&config.search, &config.fetch)?);
    let generator = LlmGenerator::new(provider, fetcher.clone())
        .with_results_per_query(config.search.results_per_query)
        .with_call_timeout(Duration::from_secs(CALL_TIMEOUT_SECS));

    let orchestrator = WorkflowOrchestrator::new(
        Arc::new(generator),
        fetcher,
        ctx.store.clone(),
        options.pipeline(&config.pipeline),
        &config.fetch,
    )
    .with_reporter(Arc::new(ConsoleReporter::new(output)));

    let run_id = RunId::from_title(&request.title);
    let destination = options
        .output
        .clone()
        .unwrap_or_else(|| ctx.article_path(&run_id));

    let rt = Runtime::new()?;
    rt.block_on(execute(&orchestrator, &request, options.fresh, &destination, output))
}

/// Execute one run and persist the rendered article
pub async fn execute(
    orchestrator: &WorkflowOrchestrator,
    request: &ArticleRequest,
    fresh: bool,
    destination: &Path,
    output: Output,
) -> Result<RunReport> {
    let run_id = RunId::from_title(&request.title);
    if fresh {
        let removed = orchestrator.store().clear(&run_id, None)?;
        if removed > 0 {
            output.info(&format!("Cleared {} cached phases of '{}'", removed, run_id));
        }
    }

    let report = orchestrator.run(request).await;

    if let Some(article) = &report.article {
        write_article(destination, &article.full_text_markdown)?;
        output.success(&format!("Article written to {}", destination.display()));
    }

    output.section("Summary");
    for phase in &report.phases {
        let counts = phase
            .counts
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        output.info(&format!(
            "{:<22} {:<10} {}{}",
            phase.phase.name(),
            phase.status,
            phase.summary,
            counts
        ));
    }
    if report.is_success() {
        output.success(&format!(
            "Run '{}' {} in {:.1}s",
            report.run_id,
            report.outcome,
            report.duration.as_secs_f64()
        ));
    } else {
        output.error(&format!("Run '{}' {}", report.run_id, report.outcome));
    }

    Ok(report)
}

fn write_article(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, markdown)?;
    Ok(())
}

//! Status Command
//!
//! Shows which phases of a run have persisted checkpoints.

use serde::Serialize;

use crate::cli::util::{CommandContext, resolve_run};
use crate::types::{Result, RunId};
use crate::workflow::Phase;

#[derive(Debug, Serialize)]
pub struct RunStatus {
    pub run: RunId,
    pub cached: Vec<Phase>,
    /// Next phase that would execute on resume
    pub next: Option<Phase>,
    pub article: Option<String>,
}

/// Cached state of one run, or of every run when `run` is `None`
pub fn collect(ctx: &CommandContext, run: Option<&str>) -> Result<Vec<RunStatus>> {
    let runs = match run {
        Some(raw) => vec![resolve_run(raw)?],
        None => {
            let mut runs = ctx.store.runs()?;
            runs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            runs
        }
    };

    runs.into_iter()
        .map(|run| {
            let cached = ctx.store.cached_phases(&run)?;
            let next = Phase::ALL.into_iter().find(|p| !cached.contains(p));
            let article_path = ctx.article_path(&run);
            let article = article_path
                .exists()
                .then(|| article_path.display().to_string());
            Ok(RunStatus {
                run,
                cached,
                next,
                article,
            })
        })
        .collect()
}

pub fn run(ctx: &CommandContext, run: Option<&str>, format: &str) -> Result<()> {
    let statuses = collect(ctx, run)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("Quillwork Status ({} storage)", ctx.store.backend_name());
    println!("══════════════════════════════════════");

    if statuses.is_empty() {
        println!("No runs found. Run 'quillwork write <title>' to start one.");
        return Ok(());
    }

    for status in statuses {
        println!();
        println!("Run: {}", status.run);
        for phase in Phase::ALL {
            let mark = if status.cached.contains(&phase) { "✓" } else { "·" };
            println!("  {} {}", mark, phase.name());
        }
        match status.next {
            Some(phase) => println!("  Next: {}", phase.name()),
            None => println!("  Complete"),
        }
        if let Some(path) = status.article {
            println!("  Article: {}", path);
        }
    }

    Ok(())
}

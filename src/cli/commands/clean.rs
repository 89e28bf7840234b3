//! Clean Command
//!
//! Clears checkpoints of one phase, one run, or every run.

use crate::cli::util::{CommandContext, resolve_run};
use crate::types::{QuillError, Result, RunId};
use crate::workflow::Phase;

/// Remove cached phases; returns the number of records removed
///
/// Clearing the whole run also deletes its default article file.
pub fn clear(ctx: &CommandContext, run: &RunId, phase: Option<Phase>) -> Result<usize> {
    let removed = ctx.store.clear(run, phase)?;

    if phase.is_none() {
        let article = ctx.article_path(run);
        if article.exists() {
            std::fs::remove_file(&article)?;
        }
        if let Some(dir) = article.parent()
            && dir.exists()
            && std::fs::read_dir(dir)?.next().is_none()
        {
            std::fs::remove_dir(dir)?;
        }
    }

    Ok(removed)
}

pub fn run(ctx: &CommandContext, run: Option<&str>, phase: Option<Phase>, all: bool) -> Result<()> {
    if all {
        let mut total = 0;
        let runs = ctx.store.runs()?;
        for run in &runs {
            total += clear(ctx, run, None)?;
        }
        println!("✓ Cleared {} checkpoints across {} runs", total, runs.len());
        return Ok(());
    }

    let raw = run.ok_or_else(|| {
        QuillError::Config("Specify a run id or title, or pass --all".to_string())
    })?;
    let run = resolve_run(raw)?;
    let removed = clear(ctx, &run, phase)?;

    match phase {
        Some(phase) if removed > 0 => println!("✓ Cleared {} checkpoint of '{}'", phase, run),
        Some(phase) => println!("  No {} checkpoint for '{}'", phase, run),
        None if removed > 0 => println!("✓ Cleared {} checkpoints of '{}'", removed, run),
        None => println!("  Nothing cached for '{}'", run),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageBackendKind};
    use crate::storage::fingerprint;
    use crate::testing::{research_for, sample_plan};

    fn context(dir: &std::path::Path) -> CommandContext {
        let mut config = Config::default();
        config.storage.backend = StorageBackendKind::Fs;
        config.storage.data_dir = dir.to_path_buf();
        CommandContext::from_config(config).unwrap()
    }

    fn seed(ctx: &CommandContext, run: &RunId) {
        let fp = fingerprint("input").unwrap();
        let plan = sample_plan(2);
        ctx.store.put(run, Phase::Plan, &plan, &fp).unwrap();
        ctx.store
            .put(run, Phase::Research, &research_for(&plan), &fp)
            .unwrap();
    }

    #[test]
    fn test_clear_single_phase() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let run = RunId::from_title("Async Rust");
        seed(&ctx, &run);

        assert_eq!(clear(&ctx, &run, Some(Phase::Research)).unwrap(), 1);
        assert_eq!(ctx.store.cached_phases(&run).unwrap(), vec![Phase::Plan]);
        assert_eq!(clear(&ctx, &run, Some(Phase::Research)).unwrap(), 0);
    }

    #[test]
    fn test_clear_run_removes_article() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let run = RunId::from_title("Async Rust");
        seed(&ctx, &run);
        std::fs::write(ctx.article_path(&run), "# Async Rust\n").unwrap();

        assert_eq!(clear(&ctx, &run, None).unwrap(), 2);
        assert!(ctx.store.cached_phases(&run).unwrap().is_empty());
        assert!(!ctx.article_path(&run).exists());
        assert!(!dir.path().join("async-rust").exists());
    }

    #[test]
    fn test_run_requires_target() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        assert!(matches!(run(&ctx, None, None, false), Err(QuillError::Config(_))));
        run(&ctx, None, None, true).unwrap();
    }
}

//! Config Command
//!
//! Usage:
//!   quillwork config show [-f json]
//!   quillwork config path
//!   quillwork config init [-g] [--force]

use std::path::Path;

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective configuration (merged from all sources)
pub fn show(config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = ConfigLoader::load_with(config_path)?;
    ConfigLoader::show_config(&config, format == "json")
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let existed = if global {
        ConfigLoader::global_config_path().is_some_and(|p| p.exists())
    } else {
        ConfigLoader::project_config_path().exists()
    };

    let path = ConfigLoader::init(global, force)?;
    let scope = if global { "global" } else { "project" };

    if existed && !force {
        println!("  Kept existing {} configuration: {}", scope, path.display());
        println!("  Use --force to overwrite it.");
    } else {
        println!("✓ Initialized {} configuration", scope);
        println!("  Config: {}", path.display());
    }
    Ok(())
}

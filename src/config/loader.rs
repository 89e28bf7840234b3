//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (<config dir>/quillwork/config.toml)
//! 3. Project config (./quillwork.toml, or the file given with `--config`)
//! 4. Environment variables (QUILLWORK_ prefix, `__` between sections)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{QuillError, Result};

const ENV_PREFIX: &str = "QUILLWORK_";
const PROJECT_CONFIG_FILE: &str = "quillwork.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layered(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Like [`Self::load`], with an explicit file standing in for the project config
    pub fn load_with(project: Option<&Path>) -> Result<Config> {
        match project {
            Some(path) if !path.exists() => Err(QuillError::Config(format!(
                "Config file not found: {}",
                path.display()
            ))),
            Some(path) => Self::load_layered(Self::global_config_path().as_deref(), path),
            None => Self::load(),
        }
    }

    /// Resolve the chain from explicit file locations; missing files are skipped
    pub fn load_layered(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // QUILLWORK_PIPELINE__MAX_RETRIES -> pipeline.max_retries
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| QuillError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory, e.g. ~/.config/quillwork/
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "quillwork").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(config: &Config, as_json: bool) -> Result<()> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!("{}", Self::render_toml(config)?);
        }
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default config file; returns its path
    ///
    /// An existing file is kept unless `force` is set.
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let path = if global {
            Self::global_config_path().ok_or_else(|| {
                QuillError::Config("Cannot determine global config directory".to_string())
            })?
        } else {
            Self::project_config_path()
        };
        Self::write_default(&path, force)?;
        Ok(path)
    }

    pub fn write_default(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(false);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = format!(
            "# quillwork configuration\n\
             # API keys may be set here or via OPENAI_API_KEY / SERPER_API_KEY.\n\n{}",
            Self::render_toml(&Config::default())?
        );
        fs::write(path, content)?;
        info!("Created config: {}", path.display());
        Ok(true)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn render_toml(config: &Config) -> Result<String> {
        toml::to_string_pretty(config).map_err(|e| QuillError::Config(e.to_string()))
    }
}

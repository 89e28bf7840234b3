use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quillwork::cli::commands::write::WriteOptions;
use quillwork::cli::{CommandContext, Output};
use quillwork::workflow::Phase;

#[derive(Parser)]
#[command(name = "quillwork")]
#[command(
    version,
    about = "Research-backed blog article writer with resumable phases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./quillwork.toml layered over the global config)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write (or resume) an article
    Write {
        #[arg(help = "Article title")]
        title: String,
        #[arg(long, short, default_value = "", help = "What the article should cover")]
        description: String,
        #[arg(long = "length", short = 'n', help = "Target length in words")]
        length: Option<u32>,
        #[arg(long, help = "File with a fixed section layout")]
        layout: Option<PathBuf>,
        #[arg(long, help = "Discard cached phases and start over")]
        fresh: bool,
        #[arg(long, short, help = "Output markdown path")]
        output: Option<PathBuf>,
        #[arg(long = "no-augment", help = "Skip fetching full page content")]
        no_augment: bool,
        #[arg(long = "no-enhance", help = "Skip the final polish pass")]
        no_enhance: bool,
    },

    /// Show cached phases of a run (or of all runs)
    Status {
        #[arg(help = "Run id or article title")]
        run: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Clear cached phases
    Clean {
        #[arg(help = "Run id or article title")]
        run: Option<String>,
        #[arg(long, help = "Only clear this phase (plan, research, augment, ...)")]
        phase: Option<Phase>,
        #[arg(long, conflicts_with_all = ["run", "phase"], help = "Clear every run")]
        all: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            Output::new().error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = Output::quiet(cli.quiet);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Write {
            title,
            description,
            length,
            layout,
            fresh,
            output: destination,
            no_augment,
            no_enhance,
        } => {
            let ctx = CommandContext::load(config_path)?;
            let report = quillwork::cli::commands::write::run(
                ctx,
                WriteOptions {
                    title,
                    description,
                    target_words: length,
                    layout,
                    fresh,
                    output: destination,
                    no_augment,
                    no_enhance,
                },
                output,
            )?;
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status { run, format } => {
            let ctx = CommandContext::load(config_path)?;
            quillwork::cli::commands::status::run(&ctx, run.as_deref(), &format)?;
        }
        Commands::Clean { run, phase, all } => {
            let ctx = CommandContext::load(config_path)?;
            quillwork::cli::commands::clean::run(&ctx, run.as_deref(), phase, all)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                quillwork::cli::commands::config::show(config_path, &format)?;
            }
            ConfigAction::Path => {
                quillwork::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                quillwork::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

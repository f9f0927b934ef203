// Forza catalog CLI - batch catalog reconciliation over conventional paths

mod catalog;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "forza-catalog")]
#[command(about = "Multi-source product catalog reconciliation (batch, idempotent)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: normalize, merge, classify, link, write
    #[command(after_help = "\
Examples:
  forza-catalog run
  forza-catalog run --config catalog.toml
  forza-catalog run --json
  forza-catalog run --dry-run")]
    Run {
        /// Path to a catalog.toml (defaults cover the conventional layout)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output the audit JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write the audit JSON to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Run every stage but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a catalog config without running
    #[command(after_help = "\
Examples:
  forza-catalog validate catalog.toml")]
    Validate {
        /// Path to the catalog.toml config file
        config: PathBuf,
    },

    /// Re-link TDS documents and images against the existing store
    #[command(after_help = "\
Examples:
  forza-catalog link-assets
  forza-catalog link-assets --fix")]
    LinkAssets {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Apply corrective file copies and rewrite the store
        /// (default is report-only). Never deletes source files.
        #[arg(long)]
        fix: bool,
    },

    /// Export the consolidated store as a detailed CSV
    #[command(after_help = "\
Examples:
  forza-catalog export
  forza-catalog export -o products.csv")]
    Export {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (defaults to the conventional export path)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        " ",
        env!("TARGET"),
        ")"
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            dry_run,
        } => catalog::cmd_run(config, json, output, dry_run),
        Commands::Validate { config } => catalog::cmd_validate(config),
        Commands::LinkAssets { config, fix } => catalog::cmd_link_assets(config, fix),
        Commands::Export { config, output } => catalog::cmd_export(config, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn with_code(code: u8, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

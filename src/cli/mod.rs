//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to the build
//! command implementations.

mod build;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Stylebuild - compile stylesheet units discovered from a project provider
#[derive(Parser)]
#[command(name = "stylebuild")]
#[command(about = "Stylebuild - compile and watch LESS/CSS compilation units")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the build and watch commands.
#[derive(Debug, clap::Args)]
pub struct BuildArgs {
    /// Path to stylebuild.toml (default: walk up from the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Provider command printing the JSON unit list (overrides config)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Preprocessor command reading stdin and writing CSS (overrides config)
    #[arg(long)]
    pub preprocess: Option<String>,

    /// Number of parallel unit pipelines (default: available cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile every unit once; exits non-zero if any unit failed
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },
    /// Rebuild all units whenever a watched file changes
    Watch {
        #[command(flatten)]
        args: BuildArgs,

        /// Debounce window for change events, in milliseconds
        #[arg(long)]
        debounce_ms: Option<u32>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { args } => build::run_build(&args),
        Commands::Watch { args, debounce_ms } => build::run_watch(&args, debounce_ms),
    }
}

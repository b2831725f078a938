//! Build and watch command implementations

use std::path::PathBuf;
use std::process::ExitCode;

use super::{BuildArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::AggregateBuild;
use crate::config::{
    find_config, load_config, merge_cli_overrides, CliOverrides, StylebuildConfig,
};
use crate::registry::UnitRegistry;
use crate::transform::TransformChain;
use crate::watch::watch_and_rebuild;

/// Load config and determine the project root from its location.
fn load_setup(args: &BuildArgs, debounce_ms: Option<u32>) -> Result<(StylebuildConfig, PathBuf), ExitCode> {
    let config_path = match &args.config {
        Some(p) => Some(p.clone()),
        None => find_config(),
    };

    let (mut config, root) = match &config_path {
        Some(path) => {
            if args.verbose {
                println!("Using config: {}", path.display());
            }
            let config = load_config(Some(path)).map_err(|e| {
                eprintln!("Error loading config: {}", e);
                ExitCode::from(EXIT_ERROR)
            })?;
            let root = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
            (config, root)
        }
        None => {
            if args.verbose {
                println!("No stylebuild.toml found, using defaults");
            }
            (StylebuildConfig::default(), std::env::current_dir().unwrap_or_default())
        }
    };

    let overrides = CliOverrides {
        provider: args.provider.clone(),
        preprocess: args.preprocess.clone(),
        debounce_ms,
    };
    merge_cli_overrides(&mut config, &overrides);

    Ok((config, root))
}

/// Build the registry and aggregate executor from loaded configuration.
fn build_setup(
    args: &BuildArgs,
    config: &StylebuildConfig,
    root: PathBuf,
) -> Result<(UnitRegistry, AggregateBuild), ExitCode> {
    let registry = UnitRegistry::from_config(config).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })?;

    let chain = TransformChain::from_config(&config.transform);
    let mut build = AggregateBuild::new(chain, root).with_verbose(args.verbose);
    if let Some(jobs) = args.jobs {
        build = build.with_jobs(jobs);
    }

    Ok((registry, build))
}

/// Run the one-shot build command.
pub fn run_build(args: &BuildArgs) -> ExitCode {
    let (config, root) = match load_setup(args, None) {
        Ok(setup) => setup,
        Err(code) => return code,
    };
    let (registry, build) = match build_setup(args, &config, root) {
        Ok(setup) => setup,
        Err(code) => return code,
    };

    // Provider failure is fatal before any pipeline starts
    let loaded = match registry.load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    for rejection in &loaded.rejected {
        eprintln!("Warning: skipping invalid {}", rejection);
    }

    let result = build.run(&loaded.units);

    if result.is_success() {
        println!("{}", result.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", result.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the watch command.
pub fn run_watch(args: &BuildArgs, debounce_ms: Option<u32>) -> ExitCode {
    let (config, root) = match load_setup(args, debounce_ms) {
        Ok(setup) => setup,
        Err(code) => return code,
    };
    let (registry, build) = match build_setup(args, &config, root) {
        Ok(setup) => setup,
        Err(code) => return code,
    };

    println!("Starting watch mode...");
    println!("Press Ctrl+C to stop");
    println!();

    // Runs until externally terminated; build failures keep the loop alive,
    // registry and watcher failures end it.
    match watch_and_rebuild(registry, build, config.watch.clone()) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

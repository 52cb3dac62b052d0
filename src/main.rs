//! pml-check: run the PML convergence checks and exit non-zero on failure

use anyhow::{Context, Result};
use clap::Parser;
use pml_check::{Check, HarnessConfig, TracingLogger, YeeSolver, certify};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pml-check")]
#[command(about = "Certify that an FDTD absorbing boundary reflects at the expected rate")]
#[command(version)]
struct Args {
    /// JSON configuration file (missing keys keep their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run only these checks (repeatable); order is always fixed
    #[arg(long = "check", value_enum)]
    checks: Vec<Check>,

    /// Also run the cylindrical sweep (informational only)
    #[arg(long)]
    include_cylindrical: bool,

    /// Give up on a trial after this many decay windows
    #[arg(long)]
    max_windows: Option<usize>,

    /// Print the sweep records as JSON on success
    #[arg(long)]
    json: bool,

    /// Show solver and accumulator diagnostics
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "debug"
    } else {
        "info,yee_fdtd=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => HarnessConfig::default(),
    };
    if args.include_cylindrical {
        config.include_cylindrical = true;
    }
    if args.max_windows.is_some() {
        config.steady_state.max_windows = args.max_windows;
    }
    config.validate().context("Invalid configuration")?;

    let solver = YeeSolver {
        courant: config.courant,
    };
    let logger = TracingLogger::new();
    let report = certify(&solver, &config, &args.checks, &logger)?;

    if args.json && logger.is_master() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

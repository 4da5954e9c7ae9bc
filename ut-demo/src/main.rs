//! ut-demo - host runner for the ut-core engine
//!
//! Registers the smoke suites, runs them once and turns the tally into the
//! process exit status.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use std::path::PathBuf;
use tracing::{debug, info};
use ut_core::{
    Config, ConsoleReporter, JsonReporter, ReportLevel, Reporter, Runner, TracingReporter,
};

mod suites;

/// Run the ut-core smoke suites
#[derive(Parser)]
#[command(name = "ut-demo")]
#[command(about = "Run the ut-core smoke suites")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report level (all, fail_only, summary)
    #[arg(short, long)]
    report_level: Option<ReportLevel>,

    /// Output renderer
    #[arg(long, value_enum, default_value = "console")]
    reporter: ReporterKind,

    /// Only run tests whose name contains this pattern
    #[arg(long)]
    filter: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReporterKind {
    Console,
    Json,
    Tracing,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = load_config(&cli)?;
    debug!(?config, "effective configuration");

    if cli.reporter == ReporterKind::Console {
        println!("{}", "=== ut-core smoke suites ===".cyan().bold());
    }

    let reporter: Box<dyn Reporter> = match cli.reporter {
        ReporterKind::Console => Box::new(ConsoleReporter::new(config.color)),
        ReporterKind::Json => Box::new(JsonReporter::new()),
        ReporterKind::Tracing => Box::new(TracingReporter),
    };

    let mut runner = Runner::with_reporter(config, reporter);
    suites::register(&mut runner);

    let tally = runner.run().context("Failed to run test suites")?;
    info!(success = tally.is_success(), "done");

    if tally.is_success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };

    let mut config = config
        .apply_env()
        .context("Invalid test configuration in environment")?;

    if let Some(level) = cli.report_level {
        config.report_level = level;
    }
    if let Some(filter) = &cli.filter {
        config.filter = Some(filter.clone());
    }
    if cli.no_color {
        config.color = false;
    }

    Ok(config)
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // stdout belongs to the reporter
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

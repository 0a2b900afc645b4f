//! Run command - full strategy evaluation

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use tracing::{info, warn};

use dpitest_core::cancel::CancelToken;
use dpitest_core::catalog::{CatalogOptions, TargetCatalog};
use dpitest_core::classifier::ResultClassifier;
use dpitest_core::config::TesterConfig;
use dpitest_core::model::{Mode, StrategyResult, TestRun, Verdict};
use dpitest_core::orchestrator::Orchestrator;
use dpitest_core::probe::ProbeEngine;
use dpitest_core::report::ReportGenerator;
use dpitest_core::strategy::StrategyRepository;
use dpitest_platform::{Credentials, ServiceController, SystemServiceManager};

/// Environment variable holding the elevation secret
///
/// Delivered to the elevation wrapper over stdin; it never appears in an
/// argument vector or a log line.
pub const ELEVATION_SECRET_VAR: &str = "DPITEST_SUDO_PASSWORD";

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Which target sections count as critical
    #[arg(short, long, value_enum, default_value = "full")]
    pub mode: ModeArg,

    /// Evaluate only the named strategies, in the given order (repeatable)
    #[arg(short, long = "strategy", value_name = "NAME")]
    pub strategies: Vec<String>,

    /// Validate strategies and targets without touching the service
    #[arg(long)]
    pub dry_run: bool,
}

/// Mode selection on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Probe every section
    Full,
    /// Messaging section plus non-critical targets
    Messaging,
    /// Video section plus non-critical targets
    Video,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Full => Mode::Full,
            ModeArg::Messaging => Mode::Messaging,
            ModeArg::Video => Mode::Video,
        }
    }
}

/// Execute the run command
pub async fn execute(args: RunArgs, config: TesterConfig) -> Result<()> {
    let mode = Mode::from(args.mode);

    let repository = StrategyRepository::new(&config.paths.strategies_dir);
    let strategies = if args.strategies.is_empty() {
        repository.load_all().context("Failed to load strategies")?
    } else {
        repository
            .load_named(&args.strategies)
            .context("Failed to load requested strategies")?
    };
    anyhow::ensure!(
        !strategies.is_empty(),
        "No strategies found in {}",
        config.paths.strategies_dir.display()
    );

    let options = CatalogOptions::from(&config.catalog);
    let catalog = TargetCatalog::load(&config.paths.targets_file, &options)
        .context("Failed to load target catalog")?;
    let targets = catalog.targets_for(mode);
    anyhow::ensure!(!targets.is_empty(), "No targets in scope for mode '{mode}'");

    info!(
        strategies = strategies.len(),
        targets = targets.len(),
        %mode,
        "Evaluation prepared"
    );

    if args.dry_run {
        println!(
            "{} {} strategies, {} targets ({} catalog lines skipped)",
            "Dry run:".yellow().bold(),
            strategies.len(),
            targets.len(),
            catalog.skipped.len()
        );
        for strategy in &strategies {
            println!("  {}", strategy.name);
        }
        return Ok(());
    }

    let mut manager = SystemServiceManager::new(
        &config.service.name,
        &config.service.worker_process,
        Duration::from_secs(config.service.command_timeout_secs),
    );
    match std::env::var(ELEVATION_SECRET_VAR) {
        Ok(secret) if !secret.is_empty() => {
            manager = manager.with_credentials(Credentials::new(secret));
        }
        _ => warn!(
            "{} not set, service commands run unprivileged",
            ELEVATION_SECRET_VAR
        ),
    }

    let mut controller = ServiceController::from_config(manager, &config);
    let engine = ProbeEngine::new(config.probe.clone());
    let classifier = ResultClassifier::new(config.probe.success_threshold);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, finishing current strategy then restoring");
        handler_token.request();
    })
    .context("Failed to set signal handler")?;

    let mut run = Orchestrator::new(
        &mut controller,
        &engine,
        classifier,
        Duration::from_millis(config.service.stabilize_delay_ms),
    )
    .run(&strategies, &targets, mode, &cancel)
    .await
    .context("Evaluation run failed")?;

    ReportGenerator::new(&config.paths)
        .finalize(&mut run, &strategies, &mut controller)
        .await
        .context("Failed to finalize results")?;

    print_summary(&run);
    Ok(())
}

fn print_summary(run: &TestRun) {
    println!();
    println!("{}", "Evaluation results".bold());
    for result in &run.results {
        println!("  {}  {}", verdict_badge(result), result.strategy_name);
    }
    if run.cancelled {
        println!("{}", "Run was cancelled before completing".yellow());
    }
    match &run.winner {
        Some(name) => println!("\n{} {}", "Committed:".green().bold(), name),
        None => println!("\n{}", "No working strategy; original config restored".red()),
    }
    if let Some(path) = &run.report_path {
        println!("Report: {}", path.display());
    }
}

fn verdict_badge(result: &StrategyResult) -> String {
    let rate = format!("{:5.1}%", result.success_rate);
    match result.verdict {
        Verdict::Good => format!("{} {}", "GOOD   ".green().bold(), rate),
        Verdict::Partial => format!("{} {}", "PARTIAL".yellow().bold(), rate),
        Verdict::Bad => format!("{} {}", "BAD    ".red().bold(), rate),
    }
}

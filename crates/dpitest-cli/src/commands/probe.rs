//! Probe command - one-off catalog probe against the current live config

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::info;

use dpitest_core::cancel::CancelToken;
use dpitest_core::catalog::{CatalogOptions, TargetCatalog};
use dpitest_core::config::TesterConfig;
use dpitest_core::model::{Mode, Outcome, ProbeResult};
use dpitest_core::probe::{ProbeEngine, Prober};

use super::run::ModeArg;

/// Probe command arguments
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Which target sections to probe
    #[arg(short, long, value_enum, default_value = "full")]
    pub mode: ModeArg,
}

/// Execute the probe command
///
/// Probes whatever configuration the service is running right now; no
/// strategy is applied and nothing is restored.
pub async fn execute(args: ProbeArgs, config: TesterConfig) -> Result<()> {
    let mode = Mode::from(args.mode);
    let options = CatalogOptions::from(&config.catalog);
    let catalog = TargetCatalog::load(&config.paths.targets_file, &options)
        .context("Failed to load target catalog")?;
    let targets = catalog.targets_for(mode);
    anyhow::ensure!(!targets.is_empty(), "No targets in scope for mode '{mode}'");

    info!(targets = targets.len(), %mode, "Probing current configuration");

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.request())
        .context("Failed to set signal handler")?;

    let engine = ProbeEngine::new(config.probe.clone());
    let results = engine.probe_all(&targets, &cancel).await;

    let successes = results.iter().filter(|r| r.outcome.is_success()).count();
    for result in &results {
        println!("  {}  {}  {}", outcome_badge(result), result.target_name, result.detail);
    }
    println!(
        "\n{} {}/{} targets reachable",
        "Summary:".bold(),
        successes,
        results.len()
    );
    Ok(())
}

fn outcome_badge(result: &ProbeResult) -> String {
    match result.outcome {
        Outcome::Success => "OK     ".green().bold().to_string(),
        Outcome::Blocked => "BLOCKED".red().bold().to_string(),
        Outcome::Inconclusive(_) => "UNKNOWN".yellow().to_string(),
    }
}

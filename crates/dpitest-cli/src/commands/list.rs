//! List command - inventory of strategies and targets

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dpitest_core::catalog::{CatalogOptions, TargetCatalog};
use dpitest_core::config::TesterConfig;
use dpitest_core::model::TargetCategory;
use dpitest_core::strategy::StrategyRepository;

/// List command arguments
#[derive(Args, Debug)]
pub struct ListArgs {
    /// List only strategies
    #[arg(long, conflicts_with = "targets")]
    pub strategies: bool,

    /// List only targets
    #[arg(long)]
    pub targets: bool,
}

/// Execute the list command
pub fn execute(args: ListArgs, config: TesterConfig) -> Result<()> {
    let everything = !args.strategies && !args.targets;

    if args.strategies || everything {
        let repository = StrategyRepository::new(&config.paths.strategies_dir);
        let strategies = repository.load_all().context("Failed to load strategies")?;
        println!(
            "{} ({} in {})",
            "Strategies".bold(),
            strategies.len(),
            config.paths.strategies_dir.display()
        );
        for strategy in &strategies {
            println!("  {}", strategy.name);
        }
    }

    if args.targets || everything {
        let options = CatalogOptions::from(&config.catalog);
        let catalog = TargetCatalog::load(&config.paths.targets_file, &options)
            .context("Failed to load target catalog")?;
        println!(
            "{} ({} in {})",
            "Targets".bold(),
            catalog.targets.len(),
            catalog.path().display()
        );
        for target in &catalog.targets {
            println!("  {}  {}", category_label(target.category), target.name);
        }
        for (line, reason) in &catalog.skipped {
            println!("  {} line {}: {}", "skipped".yellow(), line, reason);
        }
    }

    Ok(())
}

fn category_label(category: TargetCategory) -> &'static str {
    match category {
        TargetCategory::CriticalA => "critical-a",
        TargetCategory::CriticalB => "critical-b",
        TargetCategory::Other => "other     ",
    }
}

//! dpitest CLI
//!
//! Command-line interface for the strategy evaluation engine.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args)?;

    let result = run(args).await;

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = commands::load_config(args.config.as_deref())?;

    match args.command {
        commands::Command::Run(run_args) => commands::run::execute(run_args, config).await,
        commands::Command::Probe(probe_args) => commands::probe::execute(probe_args, config).await,
        commands::Command::List(list_args) => commands::list::execute(list_args, config),
    }
}

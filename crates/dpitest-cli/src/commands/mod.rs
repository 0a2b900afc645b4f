//! CLI commands

pub mod list;
pub mod probe;
pub mod run;

use anyhow::{Context, Result};
use clap::Subcommand;
use directories::ProjectDirs;
use tracing::{debug, info};

use dpitest_core::config::TesterConfig;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate strategies and commit the best one (main command)
    Run(run::RunArgs),

    /// Probe the target catalog once, without touching any strategy
    Probe(probe::ProbeArgs),

    /// List available strategies and targets
    List(list::ListArgs),
}

/// Resolve the engine configuration
///
/// Priority: explicit `-c` path (must exist), `./dpitest.toml`, the platform
/// config directory, then built-in defaults.
pub fn load_config(explicit: Option<&str>) -> Result<TesterConfig> {
    if let Some(path) = explicit {
        return TesterConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path));
    }

    let local = std::path::Path::new("dpitest.toml");
    if local.exists() {
        info!(path = %local.display(), "Using local configuration");
        return TesterConfig::load(local)
            .with_context(|| format!("Failed to load config from {}", local.display()));
    }

    if let Some(dirs) = ProjectDirs::from("", "", "dpitest") {
        let path = dirs.config_dir().join("dpitest.toml");
        if path.exists() {
            info!(path = %path.display(), "Using user configuration");
            return TesterConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()));
        }
    }

    debug!("No configuration file found, using defaults");
    Ok(TesterConfig::default())
}

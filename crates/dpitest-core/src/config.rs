//! Configuration for the strategy tester
//!
//! Strongly-typed TOML configuration covering the paths the engine touches,
//! the service control knobs, and the probe time budgets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TesterConfig {
    /// File and directory locations
    pub paths: PathsConfig,
    /// Service under test
    pub service: ServiceConfig,
    /// Probe time budgets and limits
    pub probe: ProbeConfig,
    /// Target catalog section mapping
    pub catalog: CatalogConfig,
}

impl TesterConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.probe.success_threshold) {
            return Err(Error::config_value(
                "probe.success_threshold",
                "must be between 0 and 100",
            ));
        }
        if self.probe.connect_timeout_secs == 0 || self.probe.total_timeout_secs == 0 {
            return Err(Error::config_value(
                "probe.connect_timeout_secs / probe.total_timeout_secs",
                "timeouts must be non-zero",
            ));
        }
        if self.probe.total_timeout_secs < self.probe.connect_timeout_secs {
            return Err(Error::config_value(
                "probe.total_timeout_secs",
                "must be >= probe.connect_timeout_secs",
            ));
        }
        if self.probe.max_concurrency == 0 {
            return Err(Error::config_value("probe.max_concurrency", "must be non-zero"));
        }
        if self.service.verify_retries == 0 {
            return Err(Error::config_value("service.verify_retries", "must be non-zero"));
        }
        if self.service.command_timeout_secs == 0 {
            return Err(Error::config_value(
                "service.command_timeout_secs",
                "must be non-zero",
            ));
        }
        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Every file and directory the engine reads or writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory with one file per candidate strategy
    pub strategies_dir: PathBuf,
    /// Target catalog file
    pub targets_file: PathBuf,
    /// Live configuration consumed by the service under test
    pub live_config: PathBuf,
    /// Directory for pre-run snapshots
    pub backup_dir: PathBuf,
    /// Directory for rendered reports
    pub report_dir: PathBuf,
    /// Flat list of strategies that scored GOOD
    pub good_list_file: PathBuf,
    /// Record of the currently committed strategy name
    pub active_name_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            strategies_dir: PathBuf::from("strategies"),
            targets_file: PathBuf::from("targets.txt"),
            live_config: PathBuf::from("service.conf"),
            backup_dir: PathBuf::from("backups"),
            report_dir: PathBuf::from("reports"),
            good_list_file: PathBuf::from("good_strategies.txt"),
            active_name_file: PathBuf::from("active_strategy.txt"),
        }
    }
}

/// The externally-managed service whose configuration is under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name known to the OS service manager
    pub name: String,
    /// Worker process image name, killed between applies
    pub worker_process: String,
    /// Bounded number of status polls after a start
    pub verify_retries: u32,
    /// Delay between status polls, milliseconds
    pub verify_delay_ms: u64,
    /// Timeout for each service-manager command, seconds
    pub command_timeout_secs: u64,
    /// Settle time after a restart before probing starts, milliseconds
    pub stabilize_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "dpibypass".to_string(),
            worker_process: "dpibypass-worker".to_string(),
            verify_retries: 5,
            verify_delay_ms: 500,
            command_timeout_secs: 15,
            stabilize_delay_ms: 1500,
        }
    }
}

/// Probe time budgets and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Connect timeout per attempt, seconds
    pub connect_timeout_secs: u64,
    /// Total timeout per attempt, seconds
    pub total_timeout_secs: u64,
    /// ICMP echo count for ping-only targets
    pub ping_count: u32,
    /// Upper bound on concurrently running probes
    pub max_concurrency: usize,
    /// Success-rate threshold below which a strategy is BAD, percent
    pub success_threshold: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3,
            total_timeout_secs: 6,
            ping_count: 3,
            max_concurrency: 16,
            success_threshold: 60.0,
        }
    }
}

/// Section names mapped onto the critical categories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Sections whose targets are critical-A
    pub critical_a_sections: Vec<String>,
    /// Sections whose targets are critical-B
    pub critical_b_sections: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            critical_a_sections: vec!["discord".to_string()],
            critical_b_sections: vec!["youtube".to_string()],
        }
    }
}

impl From<&CatalogConfig> for crate::catalog::CatalogOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            critical_a_sections: config.critical_a_sections.clone(),
            critical_b_sections: config.critical_b_sections.clone(),
        }
    }
}

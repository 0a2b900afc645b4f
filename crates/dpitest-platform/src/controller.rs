//! Live configuration custodian
//!
//! Implements the core `ServiceControl` seam: backup/apply/restore of the
//! configuration file consumed by the externally-managed service. Only one
//! strategy may be under test at any instant system-wide; every apply and
//! restore stops then starts the shared service, and restore is best-effort
//! because it runs inside failure and cleanup paths.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use dpitest_core::config::TesterConfig;
use dpitest_core::error::{Error as CoreError, Result as CoreResult};
use dpitest_core::service::{ServiceControl, SnapshotHandle};
use dpitest_core::strategy::Strategy;

use crate::error::Error;
use crate::manager::ServiceManager;

/// Controller lifecycle state, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing in flight
    Idle,
    /// Snapshot taken, live config untouched
    BackedUp,
    /// Strategy payload written and service restarted
    Applied,
    /// Restart confirmed by status polling
    Verified,
    /// Snapshot being written back
    Restoring,
}

/// Exclusive custodian of the live service configuration
pub struct ServiceController<M: ServiceManager> {
    manager: M,
    live_config: PathBuf,
    backup_dir: PathBuf,
    verify_retries: u32,
    verify_delay: Duration,
    state: ControllerState,
}

impl<M: ServiceManager> ServiceController<M> {
    /// Controller over the given manager and paths
    pub fn new(
        manager: M,
        live_config: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        verify_retries: u32,
        verify_delay: Duration,
    ) -> Self {
        Self {
            manager,
            live_config: live_config.into(),
            backup_dir: backup_dir.into(),
            verify_retries,
            verify_delay,
            state: ControllerState::Idle,
        }
    }

    /// Controller configured from the tester configuration
    pub fn from_config(manager: M, config: &TesterConfig) -> Self {
        Self::new(
            manager,
            config.paths.live_config.clone(),
            config.paths.backup_dir.clone(),
            config.service.verify_retries,
            Duration::from_millis(config.service.verify_delay_ms),
        )
    }

    /// Current lifecycle state
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Restart the service under the current live config and confirm it
    /// came back up
    async fn cycle_service(&self) -> Result<(), Error> {
        self.manager.stop().await?;
        if let Err(e) = self.manager.kill_workers().await {
            // Lingering workers usually die with the service; failing to
            // sweep them is not fatal on its own
            warn!(error = %e, "Worker sweep failed");
        }
        self.manager.start().await?;

        for attempt in 1..=self.verify_retries {
            if self.manager.is_active().await? {
                debug!(attempt, "Service verified active");
                return Ok(());
            }
            tokio::time::sleep(self.verify_delay).await;
        }
        Err(Error::ServiceNotRunning {
            service: "service under test".to_string(),
            status: format!("not active after {} polls", self.verify_retries),
        })
    }
}

impl<M: ServiceManager> ServiceControl for ServiceController<M> {
    async fn backup(&mut self) -> CoreResult<SnapshotHandle> {
        let content = std::fs::read(&self.live_config).map_err(|e| {
            CoreError::config_io(self.live_config.display().to_string(), e.to_string())
        })?;

        std::fs::create_dir_all(&self.backup_dir).map_err(|e| {
            CoreError::config_io(self.backup_dir.display().to_string(), e.to_string())
        })?;
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let path = self.backup_dir.join(format!("live-{stamp}.bak"));
        std::fs::write(&path, content)
            .map_err(|e| CoreError::config_io(path.display().to_string(), e.to_string()))?;

        info!(snapshot = %path.display(), "Live configuration backed up");
        self.state = ControllerState::BackedUp;
        Ok(SnapshotHandle { path })
    }

    async fn apply(&mut self, strategy: &Strategy) -> CoreResult<()> {
        debug!(strategy = %strategy.name, "Writing strategy payload as live config");
        std::fs::write(&self.live_config, &strategy.payload).map_err(|e| {
            CoreError::config_io(self.live_config.display().to_string(), e.to_string())
        })?;
        self.state = ControllerState::Applied;

        match self.cycle_service().await {
            Ok(()) => {
                self.state = ControllerState::Verified;
                info!(strategy = %strategy.name, "Strategy applied and service verified");
                Ok(())
            }
            Err(e) => {
                self.state = ControllerState::Restoring;
                Err(CoreError::service_control("apply", e.to_string()))
            }
        }
    }

    async fn restore(&mut self, snapshot: &SnapshotHandle) {
        self.state = ControllerState::Restoring;
        match std::fs::read(&snapshot.path) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&self.live_config, content) {
                    warn!(error = %e, "Restore: failed to write live config");
                }
            }
            Err(e) => warn!(snapshot = %snapshot.path.display(), error = %e, "Restore: failed to read snapshot"),
        }
        if let Err(e) = self.cycle_service().await {
            warn!(error = %e, "Restore: service did not come back cleanly");
        }
        self.state = ControllerState::Idle;
    }
}

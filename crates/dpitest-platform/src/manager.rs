//! OS service-manager boundary
//!
//! Issues start/stop/status/kill commands against the named service through
//! the platform's service manager (`sc` on Windows, `systemctl` elsewhere).
//! Expected no-op failures ("already running", "not running", nothing to
//! kill) are tolerated; spawn failures and timeouts are not.

use std::time::Duration;

use tracing::{debug, trace};

use crate::command::{self, CommandOutput, CommandSpec, Credentials};
use crate::error::Result;

/// Service lifecycle commands, as far as the controller needs them
///
/// Tests substitute a scripted fake to drive the controller without touching
/// a real service manager.
pub trait ServiceManager {
    /// Start the service
    async fn start(&self) -> Result<()>;
    /// Stop the service; a service that is already stopped is not an error
    async fn stop(&self) -> Result<()>;
    /// Whether the service is currently in the running state
    async fn is_active(&self) -> Result<bool>;
    /// Terminate lingering worker processes; nothing to kill is not an error
    async fn kill_workers(&self) -> Result<()>;
}

/// Real service manager speaking to the OS
#[derive(Debug, Clone)]
pub struct SystemServiceManager {
    service: String,
    worker_process: String,
    timeout: Duration,
    credentials: Option<Credentials>,
}

impl SystemServiceManager {
    /// Manager for the named service
    pub fn new(
        service: impl Into<String>,
        worker_process: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            service: service.into(),
            worker_process: worker_process.into(),
            timeout,
            credentials: None,
        }
    }

    /// Route privileged commands through the elevation wrapper
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn privileged(&self, spec: CommandSpec) -> CommandSpec {
        match &self.credentials {
            Some(credentials) => spec.elevated(credentials),
            None => spec,
        }
    }

    fn start_spec(&self) -> CommandSpec {
        #[cfg(windows)]
        {
            CommandSpec::new("sc").args(["start", self.service.as_str()])
        }
        #[cfg(not(windows))]
        {
            CommandSpec::new("systemctl").args(["start", self.service.as_str()])
        }
    }

    fn stop_spec(&self) -> CommandSpec {
        #[cfg(windows)]
        {
            CommandSpec::new("sc").args(["stop", self.service.as_str()])
        }
        #[cfg(not(windows))]
        {
            CommandSpec::new("systemctl").args(["stop", self.service.as_str()])
        }
    }

    fn status_spec(&self) -> CommandSpec {
        #[cfg(windows)]
        {
            CommandSpec::new("sc").args(["query", self.service.as_str()])
        }
        #[cfg(not(windows))]
        {
            CommandSpec::new("systemctl").args(["is-active", self.service.as_str()])
        }
    }

    fn kill_spec(&self) -> CommandSpec {
        #[cfg(windows)]
        {
            CommandSpec::new("taskkill").args([
                "/IM",
                self.worker_process.as_str(),
                "/F",
                "/T",
            ])
        }
        #[cfg(not(windows))]
        {
            CommandSpec::new("pkill").args(["-x", self.worker_process.as_str()])
        }
    }

    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput> {
        let spec = self.privileged(spec);
        command::run(&spec, self.timeout).await
    }
}

/// Stderr fragments that mean the command was a no-op, not a failure
fn is_tolerated(stderr: &str, markers: &[&str]) -> bool {
    let stderr = stderr.to_lowercase();
    markers.iter().any(|m| stderr.contains(m))
}

impl ServiceManager for SystemServiceManager {
    async fn start(&self) -> Result<()> {
        let output = self.run(self.start_spec()).await?;
        if output.success || is_tolerated(&output.stderr, &["already been started", "already running", "already active"]) {
            debug!(service = %self.service, "Service start issued");
            Ok(())
        } else {
            Err(crate::error::Error::CommandFailed {
                program: "service start".to_string(),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }

    async fn stop(&self) -> Result<()> {
        let output = self.run(self.stop_spec()).await?;
        if output.success
            || is_tolerated(
                &output.stderr,
                &["not been started", "not running", "not loaded", "inactive"],
            )
        {
            debug!(service = %self.service, "Service stop issued");
            Ok(())
        } else {
            Err(crate::error::Error::CommandFailed {
                program: "service stop".to_string(),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }

    async fn is_active(&self) -> Result<bool> {
        let output = self.run(self.status_spec()).await?;
        #[cfg(windows)]
        let active = output.stdout.contains("RUNNING");
        #[cfg(not(windows))]
        let active = output.success && output.stdout.trim() == "active";
        trace!(service = %self.service, active, "Queried service status");
        Ok(active)
    }

    async fn kill_workers(&self) -> Result<()> {
        let output = self.run(self.kill_spec()).await?;
        // pkill exits 1 / taskkill errors when nothing matched
        if output.success
            || output.code == Some(1)
            || is_tolerated(&output.stderr, &["not found", "no process"])
        {
            trace!(worker = %self.worker_process, "Worker kill issued");
            Ok(())
        } else {
            Err(crate::error::Error::CommandFailed {
                program: "worker kill".to_string(),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SystemServiceManager {
        SystemServiceManager::new("zapret", "winws", Duration::from_secs(5))
    }

    #[cfg(not(windows))]
    #[test]
    fn test_unix_specs_use_systemctl() {
        let m = manager();
        assert_eq!(m.start_spec().program(), "systemctl");
        assert_eq!(m.start_spec().arg_slice(), ["start", "zapret"]);
        assert_eq!(m.status_spec().arg_slice(), ["is-active", "zapret"]);
        assert_eq!(m.kill_spec().program(), "pkill");
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_specs_use_sc() {
        let m = manager();
        assert_eq!(m.start_spec().program(), "sc");
        assert_eq!(m.kill_spec().program(), "taskkill");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_credentials_wrap_commands_with_sudo() {
        let m = manager().with_credentials(Credentials::new("pw"));
        let spec = m.privileged(m.stop_spec());
        assert_eq!(spec.program(), "sudo");
        assert!(spec.arg_slice().contains(&"systemctl".to_string()));
    }

    #[test]
    fn test_tolerated_markers() {
        assert!(is_tolerated(
            "Job for zapret.service canceled: NOT RUNNING",
            &["not running"]
        ));
        assert!(!is_tolerated("permission denied", &["not running"]));
    }
}

//! Service control seam
//!
//! The orchestrator and report generator talk to the service under test
//! through this trait; the platform crate provides the real implementation
//! over OS service-manager commands.

use std::path::PathBuf;

use crate::error::Result;
use crate::strategy::Strategy;

/// Handle to a recoverable copy of the live configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// Where the snapshot was written
    pub path: PathBuf,
}

/// Exclusive custodian of the live service configuration
///
/// Implementations guarantee the service is never left without some valid
/// configuration: `restore` is best-effort and must not fail, because it
/// runs inside failure and cleanup paths.
pub trait ServiceControl {
    /// Copy the current live config to a recoverable location
    async fn backup(&mut self) -> Result<SnapshotHandle>;

    /// Write the strategy payload as the live config and restart the service,
    /// verifying it came back up
    async fn apply(&mut self, strategy: &Strategy) -> Result<()>;

    /// Write the snapshot back and restart; failures are logged, never raised
    async fn restore(&mut self, snapshot: &SnapshotHandle);
}

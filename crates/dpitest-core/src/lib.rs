//! # dpitest Core
//!
//! Platform-independent strategy evaluation engine for a DPI-circumvention
//! service.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Strategy repository and target catalog** - Typed, validated input loading
//! - **Probe engine** - Concurrent reachability checks with protocol fallback
//! - **Result classifier** - Per-strategy GOOD/PARTIAL/BAD verdicts
//! - **Orchestrator** - The sequential apply/probe/restore loop with
//!   cooperative cancellation and rollback guarantees
//! - **Report generator** - Winner selection, persistence, HTML rendering
//!
//! The service-control boundary is the [`service::ServiceControl`] trait;
//! the platform crate supplies the real implementation over OS
//! service-manager commands.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod service;
pub mod strategy;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use catalog::TargetCatalog;
pub use classifier::ResultClassifier;
pub use config::TesterConfig;
pub use error::{Error, Result};
pub use model::{Mode, Outcome, ProbeResult, ProbeTarget, StrategyResult, TestRun, Verdict};
pub use orchestrator::Orchestrator;
pub use probe::{ProbeEngine, Prober};
pub use report::ReportGenerator;
pub use service::{ServiceControl, SnapshotHandle};
pub use strategy::{Strategy, StrategyRepository};

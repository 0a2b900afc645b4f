//! Core data model for the strategy evaluation engine
//!
//! All types here are plain data: strategies and targets are immutable once
//! loaded, probe and strategy results are write-once records produced by the
//! probe engine and classifier respectively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which target sections count as critical for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Probe every section; both critical categories in play
    #[default]
    Full,
    /// Probe the messaging section plus non-critical targets
    Messaging,
    /// Probe the video section plus non-critical targets
    Video,
}

impl Mode {
    /// Stable lowercase name, used in reports and persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Full => "full",
            Mode::Messaging => "messaging",
            Mode::Video => "video",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a probe target within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCategory {
    /// Failure disqualifies a strategy from GOOD (messaging service)
    CriticalA,
    /// Failure disqualifies a strategy from GOOD (video service)
    CriticalB,
    /// Counts toward the success rate only
    Other,
}

/// How a target is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// ICMP echo only; no HTTP attempt is made
    Ping {
        /// Host to ping
        host: String,
    },
    /// HTTP(S) URL probed with protocol fallback
    Url {
        /// Full URL
        url: String,
        /// Hostname derived from the URL, for diagnostics
        host: String,
        /// Expected HTTP status override; replaces the generic accepted set
        expect: Option<u16>,
    },
}

impl Endpoint {
    /// Build a URL endpoint, deriving the hostname
    pub fn url(url: impl Into<String>, expect: Option<u16>) -> Self {
        let url = url.into();
        let host = host_from_url(&url);
        Endpoint::Url { url, host, expect }
    }

    /// Build a ping endpoint
    pub fn ping(host: impl Into<String>) -> Self {
        Endpoint::Ping { host: host.into() }
    }

    /// Hostname this endpoint resolves against
    pub fn host(&self) -> &str {
        match self {
            Endpoint::Ping { host } => host,
            Endpoint::Url { host, .. } => host,
        }
    }
}

/// Extract the hostname from a URL for diagnostic output
pub fn host_from_url(url: &str) -> String {
    let rest = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let rest = rest.split('/').next().unwrap_or(rest);
    let rest = rest.split('@').last().unwrap_or(rest);
    rest.split(':').next().unwrap_or(rest).to_string()
}

/// One external endpoint to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// Unique name from the catalog key
    pub name: String,
    /// How to reach it
    pub endpoint: Endpoint,
    /// Criticality bucket
    pub category: TargetCategory,
}

impl ProbeTarget {
    /// Whether this target is checked with ICMP only
    pub fn is_ping_only(&self) -> bool {
        matches!(self.endpoint, Endpoint::Ping { .. })
    }
}

/// Protocol configuration used for one URL probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeProtocol {
    /// Plain HTTP/1.1
    Http11,
    /// TLS 1.2 forced
    Tls12,
    /// TLS 1.3 forced
    Tls13,
}

impl ProbeProtocol {
    /// Attempt order for URL targets
    pub const FALLBACK_ORDER: [ProbeProtocol; 3] =
        [ProbeProtocol::Http11, ProbeProtocol::Tls12, ProbeProtocol::Tls13];

    /// Short name used in result details
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeProtocol::Http11 => "http1.1",
            ProbeProtocol::Tls12 => "tls1.2",
            ProbeProtocol::Tls13 => "tls1.3",
        }
    }
}

impl std::fmt::Display for ProbeProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a probe was neither a success nor a definite block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconclusiveReason {
    /// DNS resolution failed
    Dns,
    /// The attempt timed out
    Timeout,
    /// Anything else
    Unknown,
}

impl InconclusiveReason {
    /// Short label used in details and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            InconclusiveReason::Dns => "dns",
            InconclusiveReason::Timeout => "timeout",
            InconclusiveReason::Unknown => "unknown",
        }
    }
}

/// Three-way probe outcome
///
/// Success and blocked are mutually exclusive by construction; a probe that
/// is neither is inconclusive with a recorded reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The target was reachable
    Success,
    /// The target is actively blocked (TLS tampering or connection reset)
    Blocked,
    /// Neither reachable nor provably blocked
    Inconclusive(InconclusiveReason),
}

impl Outcome {
    /// True for `Outcome::Success`
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// True for `Outcome::Blocked`
    pub fn is_blocked(&self) -> bool {
        matches!(self, Outcome::Blocked)
    }

    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "ok",
            Outcome::Blocked => "blocked",
            Outcome::Inconclusive(InconclusiveReason::Dns) => "dns",
            Outcome::Inconclusive(InconclusiveReason::Timeout) => "timeout",
            Outcome::Inconclusive(InconclusiveReason::Unknown) => "failed",
        }
    }
}

/// Result of probing a single target once
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Name of the probed target
    pub target_name: String,
    /// Three-way outcome
    pub outcome: Outcome,
    /// Protocol that produced the outcome; `None` for ping targets and when
    /// no protocol attempt was decisive
    pub protocol: Option<ProbeProtocol>,
    /// Human-readable detail (HTTP code, error text excerpt, ...)
    pub detail: String,
    /// When the probe finished
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    /// Build a result stamped with the current time
    pub fn new(
        target_name: impl Into<String>,
        outcome: Outcome,
        protocol: Option<ProbeProtocol>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            target_name: target_name.into(),
            outcome,
            protocol,
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Three-level verdict for one strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    /// Everything critical passed and the rate cleared the threshold
    Good,
    /// Exactly one critical service failed
    Partial,
    /// Low rate, both critical services failing, or service control failure
    Bad,
}

impl Verdict {
    /// Uppercase label used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Good => "GOOD",
            Verdict::Partial => "PARTIAL",
            Verdict::Bad => "BAD",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated result for one strategy iteration; write-once after
/// classification
#[derive(Debug, Clone)]
pub struct StrategyResult {
    /// Name of the evaluated strategy
    pub strategy_name: String,
    /// Mode the run was executed under
    pub mode: Mode,
    /// Per-target results, one per probed target
    pub probe_results: Vec<ProbeResult>,
    /// Number of successful probes
    pub successful_count: usize,
    /// Number of blocked probes
    pub blocked_count: usize,
    /// Number of inconclusive probes
    pub failed_count: usize,
    /// successful / total × 100, in [0, 100]; 0 when no targets were probed
    pub success_rate: f64,
    /// Whether every critical-A target succeeded; `None` when none present
    pub critical_a_passed: Option<bool>,
    /// Whether every critical-B target succeeded; `None` when none present
    pub critical_b_passed: Option<bool>,
    /// Final verdict
    pub verdict: Verdict,
    /// Why; empty for a clean GOOD
    pub verdict_reason: String,
}

/// One complete evaluation pass over all candidate strategies
#[derive(Debug)]
pub struct TestRun {
    /// Per-strategy results in strategy input order
    pub results: Vec<StrategyResult>,
    /// The mode the run was executed under
    pub mode: Mode,
    /// Pre-run snapshot of the live configuration; restorable until a winner
    /// is committed
    pub snapshot: Option<crate::service::SnapshotHandle>,
    /// Name of the winning strategy, set by the report generator
    pub winner: Option<String>,
    /// Path of the rendered report, set by the report generator
    pub report_path: Option<std::path::PathBuf>,
    /// Whether the run was cut short by cancellation
    pub cancelled: bool,
}

impl TestRun {
    /// Empty run shell for the given mode
    pub fn new(mode: Mode) -> Self {
        Self {
            results: Vec::new(),
            mode,
            snapshot: None,
            winner: None,
            report_path: None,
            cancelled: false,
        }
    }
}

//! Probe engine
//!
//! Determines per-target reachability within a bounded time budget. URL
//! targets are checked by spawning the system `curl` with up to three
//! protocol configurations; ping-only targets use the system `ping`. All
//! targets of one batch run concurrently, each attempt with its own timeout,
//! so one hanging endpoint never blocks another.

pub mod classify;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::config::ProbeConfig;
use crate::model::{
    Endpoint, InconclusiveReason, Outcome, ProbeProtocol, ProbeResult, ProbeTarget,
};

/// Anything that can probe a batch of targets
///
/// The orchestrator depends on this seam; tests substitute a scripted fake.
pub trait Prober {
    /// Probe all targets concurrently; results carry no order guarantee and
    /// are re-associated by target name. Every target gets exactly one
    /// result, including targets skipped due to cancellation.
    async fn probe_all(&self, targets: &[ProbeTarget], cancel: &CancelToken) -> Vec<ProbeResult>;
}

/// Subprocess-based probe engine (`curl` + `ping`)
#[derive(Debug, Clone)]
pub struct ProbeEngine {
    config: ProbeConfig,
}

impl ProbeEngine {
    /// Engine with the given time budgets
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Probe a single target
    pub async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        match &target.endpoint {
            Endpoint::Ping { host } => self.probe_ping(&target.name, host).await,
            Endpoint::Url { url, expect, .. } => {
                self.probe_url(&target.name, url, *expect).await
            }
        }
    }

    async fn probe_url(&self, name: &str, url: &str, expect: Option<u16>) -> ProbeResult {
        let mut last: Option<(Outcome, String)> = None;
        for protocol in ProbeProtocol::FALLBACK_ORDER {
            let (outcome, detail) = self.attempt_url(url, protocol, expect).await;
            trace!(target = name, %protocol, outcome = outcome.label(), detail, "URL attempt");
            match outcome {
                Outcome::Success | Outcome::Blocked => {
                    return ProbeResult::new(name, outcome, Some(protocol), detail);
                }
                Outcome::Inconclusive(_) => last = Some((outcome, detail)),
            }
        }
        // All three attempts inconclusive; keep the last reason
        let (outcome, last_detail) =
            last.unwrap_or((Outcome::Inconclusive(InconclusiveReason::Unknown), String::new()));
        ProbeResult::new(
            name,
            outcome,
            None,
            format!("no protocol succeeded ({last_detail})"),
        )
    }

    async fn attempt_url(
        &self,
        url: &str,
        protocol: ProbeProtocol,
        expect: Option<u16>,
    ) -> (Outcome, String) {
        let args = curl_args(url, protocol, &self.config);
        // Slack over curl's own --max-time so curl reports its timeout first
        let budget = Duration::from_secs(self.config.total_timeout_secs + 2);
        match run_checker("curl", &args, budget).await {
            Ok(output) => {
                let code = parse_http_code(&output.stdout);
                classify::classify_url_attempt(code, &output.stderr, expect)
            }
            Err(CheckerError::Timeout) => (
                Outcome::Inconclusive(InconclusiveReason::Timeout),
                "checker process timed out".to_string(),
            ),
            Err(CheckerError::Spawn(message)) => (
                Outcome::Inconclusive(InconclusiveReason::Unknown),
                format!("failed to run curl: {message}"),
            ),
        }
    }

    async fn probe_ping(&self, name: &str, host: &str) -> ProbeResult {
        let args = ping_args(host, &self.config);
        let per_reply = self.config.total_timeout_secs;
        let budget = Duration::from_secs(per_reply * u64::from(self.config.ping_count) + 2);
        match run_checker("ping", &args, budget).await {
            Ok(output) => {
                let combined = format!("{}\n{}", output.stdout, output.stderr);
                let (outcome, detail) = classify::classify_ping(output.exit_ok, &combined);
                ProbeResult::new(name, outcome, None, detail)
            }
            Err(CheckerError::Timeout) => ProbeResult::new(
                name,
                Outcome::Inconclusive(InconclusiveReason::Timeout),
                None,
                "ping process timed out",
            ),
            Err(CheckerError::Spawn(message)) => ProbeResult::new(
                name,
                Outcome::Inconclusive(InconclusiveReason::Unknown),
                None,
                format!("failed to run ping: {message}"),
            ),
        }
    }
}

impl Prober for ProbeEngine {
    async fn probe_all(&self, targets: &[ProbeTarget], cancel: &CancelToken) -> Vec<ProbeResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut set: JoinSet<ProbeResult> = JoinSet::new();

        for target in targets {
            let engine = self.clone();
            let target = target.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                // Closed semaphores cannot happen here; treat it like cancellation
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ProbeResult::new(
                            &target.name,
                            Outcome::Inconclusive(InconclusiveReason::Unknown),
                            None,
                            "probe slot unavailable",
                        )
                    }
                };
                // Queued probes observe cancellation; in-flight ones run to
                // their own timeout
                if cancel.is_cancelled() {
                    return ProbeResult::new(
                        &target.name,
                        Outcome::Inconclusive(InconclusiveReason::Unknown),
                        None,
                        "skipped: cancellation requested",
                    );
                }
                engine.probe(&target).await
            });
        }

        let mut results = Vec::with_capacity(targets.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "Probe task failed"),
            }
        }

        // A panicked task must not silently drop its target
        for target in targets {
            if !results.iter().any(|r| r.target_name == target.name) {
                results.push(ProbeResult::new(
                    &target.name,
                    Outcome::Inconclusive(InconclusiveReason::Unknown),
                    None,
                    "probe task failed",
                ));
            }
        }

        debug!(
            total = results.len(),
            ok = results.iter().filter(|r| r.outcome.is_success()).count(),
            "Probe batch finished"
        );
        results
    }
}

struct CheckerOutput {
    exit_ok: bool,
    stdout: String,
    stderr: String,
}

enum CheckerError {
    Timeout,
    Spawn(String),
}

/// Run an external checker with a hard wall-clock budget
///
/// The child is killed if the budget elapses (kill-on-drop); a missed
/// timeout is a result, never a hang.
async fn run_checker(
    program: &str,
    args: &[String],
    budget: Duration,
) -> Result<CheckerOutput, CheckerError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CheckerError::Spawn(e.to_string()))?;

    match tokio::time::timeout(budget, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CheckerOutput {
            exit_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(CheckerError::Spawn(e.to_string())),
        Err(_) => Err(CheckerError::Timeout),
    }
}

/// `curl` writes `000` when no HTTP response arrived
fn parse_http_code(stdout: &str) -> Option<u16> {
    match stdout.trim().parse::<u16>() {
        Ok(0) => None,
        Ok(code) => Some(code),
        Err(_) => None,
    }
}

fn curl_args(url: &str, protocol: ProbeProtocol, config: &ProbeConfig) -> Vec<String> {
    #[cfg(windows)]
    let null_device = "NUL";
    #[cfg(not(windows))]
    let null_device = "/dev/null";

    let mut args = vec![
        "-s".to_string(),
        "-S".to_string(),
        "-o".to_string(),
        null_device.to_string(),
        "-w".to_string(),
        "%{http_code}".to_string(),
        "--connect-timeout".to_string(),
        config.connect_timeout_secs.to_string(),
        "--max-time".to_string(),
        config.total_timeout_secs.to_string(),
    ];
    match protocol {
        ProbeProtocol::Http11 => args.push("--http1.1".to_string()),
        ProbeProtocol::Tls12 => {
            args.push("--tlsv1.2".to_string());
            args.push("--tls-max".to_string());
            args.push("1.2".to_string());
        }
        ProbeProtocol::Tls13 => {
            args.push("--tlsv1.3".to_string());
            args.push("--tls-max".to_string());
            args.push("1.3".to_string());
        }
    }
    args.push(url.to_string());
    args
}

fn ping_args(host: &str, config: &ProbeConfig) -> Vec<String> {
    #[cfg(windows)]
    {
        vec![
            "-n".to_string(),
            config.ping_count.to_string(),
            "-w".to_string(),
            (config.total_timeout_secs * 1000).to_string(),
            host.to_string(),
        ]
    }
    #[cfg(not(windows))]
    {
        vec![
            "-c".to_string(),
            config.ping_count.to_string(),
            "-W".to_string(),
            config.total_timeout_secs.to_string(),
            host.to_string(),
        ]
    }
}

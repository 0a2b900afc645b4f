//! Integration tests for the evaluation loop
//!
//! Exercise the orchestrator and report generator against scripted
//! service-control and prober fakes: rollback guarantees, cancellation,
//! apply-failure forward progress, winner commit.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dpitest_core::cancel::CancelToken;
use dpitest_core::classifier::ResultClassifier;
use dpitest_core::config::PathsConfig;
use dpitest_core::error::{Error, Result};
use dpitest_core::model::{
    Endpoint, Mode, Outcome, ProbeResult, ProbeTarget, TargetCategory, Verdict,
};
use dpitest_core::orchestrator::Orchestrator;
use dpitest_core::probe::Prober;
use dpitest_core::report::ReportGenerator;
use dpitest_core::service::{ServiceControl, SnapshotHandle};
use dpitest_core::strategy::Strategy;

/// In-memory stand-in for the live configuration and service lifecycle
#[derive(Default)]
struct FakeController {
    live: String,
    snapshot: String,
    fail_backup: bool,
    fail_apply_for: HashSet<String>,
    applied: Vec<String>,
    restores: usize,
}

impl FakeController {
    fn with_live(content: &str) -> Self {
        Self {
            live: content.to_string(),
            ..Default::default()
        }
    }
}

impl ServiceControl for FakeController {
    async fn backup(&mut self) -> Result<SnapshotHandle> {
        if self.fail_backup {
            return Err(Error::config_io("live.conf", "permission denied"));
        }
        self.snapshot = self.live.clone();
        Ok(SnapshotHandle {
            path: PathBuf::from("snapshot"),
        })
    }

    async fn apply(&mut self, strategy: &Strategy) -> Result<()> {
        if self.fail_apply_for.contains(&strategy.name) {
            return Err(Error::service_control(
                "start",
                format!("service refused strategy '{}'", strategy.name),
            ));
        }
        self.live = strategy.payload.clone();
        self.applied.push(strategy.name.clone());
        Ok(())
    }

    async fn restore(&mut self, _snapshot: &SnapshotHandle) {
        self.live = self.snapshot.clone();
        self.restores += 1;
    }
}

/// Prober returning pre-scripted outcomes per target name
struct ScriptedProber {
    outcomes: HashMap<String, Outcome>,
    batches: AtomicUsize,
    cancel_after: Option<(usize, CancelToken)>,
}

impl ScriptedProber {
    fn all_success() -> Self {
        Self {
            outcomes: HashMap::new(),
            batches: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    fn with_outcomes(outcomes: HashMap<String, Outcome>) -> Self {
        Self {
            outcomes,
            batches: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    /// Request cancellation on the token once `n` batches have completed
    fn cancel_after(mut self, n: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }
}

impl Prober for ScriptedProber {
    async fn probe_all(&self, targets: &[ProbeTarget], _cancel: &CancelToken) -> Vec<ProbeResult> {
        let batch = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if batch >= *after {
                token.request();
            }
        }
        targets
            .iter()
            .map(|t| {
                let outcome = self
                    .outcomes
                    .get(&t.name)
                    .copied()
                    .unwrap_or(Outcome::Success);
                ProbeResult::new(&t.name, outcome, None, "scripted")
            })
            .collect()
    }
}

fn strategies(names: &[&str]) -> Vec<Strategy> {
    names
        .iter()
        .map(|n| Strategy {
            name: n.to_string(),
            payload: format!("payload of {n}"),
        })
        .collect()
}

fn targets() -> Vec<ProbeTarget> {
    vec![
        ProbeTarget {
            name: "discord_web".to_string(),
            endpoint: Endpoint::url("https://discord.com", None),
            category: TargetCategory::CriticalA,
        },
        ProbeTarget {
            name: "youtube_web".to_string(),
            endpoint: Endpoint::url("https://www.youtube.com", None),
            category: TargetCategory::CriticalB,
        },
        ProbeTarget {
            name: "wiki".to_string(),
            endpoint: Endpoint::url("https://www.wikipedia.org", None),
            category: TargetCategory::Other,
        },
    ]
}

fn orchestrate<'a>(
    controller: &'a mut FakeController,
    prober: &'a ScriptedProber,
) -> Orchestrator<'a, FakeController, ScriptedProber> {
    Orchestrator::new(
        controller,
        prober,
        ResultClassifier::new(60.0),
        Duration::from_millis(0),
    )
}

#[tokio::test]
async fn results_follow_input_order_and_config_is_restored() {
    let mut controller = FakeController::with_live("original config");
    let prober = ScriptedProber::all_success();
    let strategies = strategies(&["s1", "s2", "s3"]);

    let run = orchestrate(&mut controller, &prober)
        .run(&strategies, &targets(), Mode::Full, &CancelToken::new())
        .await
        .unwrap();

    let names: Vec<_> = run.results.iter().map(|r| r.strategy_name.as_str()).collect();
    assert_eq!(names, ["s1", "s2", "s3"]);
    assert!(run.results.iter().all(|r| r.verdict == Verdict::Good));
    assert!(!run.cancelled);
    // Per-iteration restores plus the final one
    assert_eq!(controller.restores, 4);
    assert_eq!(controller.live, "original config");
}

#[tokio::test]
async fn apply_failure_is_recorded_and_loop_continues() {
    // Scenario E: apply fails for "w"; zero probes, BAD, loop reaches "x"
    let mut controller = FakeController::with_live("original config");
    controller.fail_apply_for.insert("w".to_string());
    let prober = ScriptedProber::all_success();
    let strategies = strategies(&["v", "w", "x"]);

    let run = orchestrate(&mut controller, &prober)
        .run(&strategies, &targets(), Mode::Full, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(run.results.len(), 3);
    let w = &run.results[1];
    assert_eq!(w.strategy_name, "w");
    assert_eq!(w.verdict, Verdict::Bad);
    assert!(w.probe_results.is_empty());
    assert!(w.verdict_reason.contains("service control failure"));
    assert_eq!(run.results[2].strategy_name, "x");
    assert_eq!(controller.applied, vec!["v".to_string(), "x".to_string()]);
    assert_eq!(controller.live, "original config");
}

#[tokio::test]
async fn cancellation_stops_after_current_strategy() {
    // Scenario D: cancel lands during strategy 2 of 5
    let mut controller = FakeController::with_live("original config");
    let cancel = CancelToken::new();
    let prober = ScriptedProber::all_success().cancel_after(2, cancel.clone());
    let strategies = strategies(&["s1", "s2", "s3", "s4", "s5"]);

    let run = orchestrate(&mut controller, &prober)
        .run(&strategies, &targets(), Mode::Full, &cancel)
        .await
        .unwrap();

    assert_eq!(run.results.len(), 2);
    assert!(run.cancelled);
    assert_eq!(controller.live, "original config");
}

#[tokio::test]
async fn failed_initial_backup_aborts_before_mutating() {
    let mut controller = FakeController::with_live("original config");
    controller.fail_backup = true;
    let prober = ScriptedProber::all_success();
    let strategies = strategies(&["s1"]);

    let result = orchestrate(&mut controller, &prober)
        .run(&strategies, &targets(), Mode::Full, &CancelToken::new())
        .await;

    assert!(result.is_err());
    assert!(controller.applied.is_empty());
    assert_eq!(controller.live, "original config");
}

#[tokio::test]
async fn mixed_outcomes_produce_expected_verdicts() {
    let mut controller = FakeController::with_live("original config");
    let mut outcomes = HashMap::new();
    outcomes.insert("youtube_web".to_string(), Outcome::Blocked);
    let prober = ScriptedProber::with_outcomes(outcomes);
    let strategies = strategies(&["s1"]);

    let run = orchestrate(&mut controller, &prober)
        .run(&strategies, &targets(), Mode::Full, &CancelToken::new())
        .await
        .unwrap();

    let result = &run.results[0];
    // 2 of 3 succeeded (66.7%), video critical failing
    assert_eq!(result.verdict, Verdict::Partial);
    assert_eq!(result.critical_a_passed, Some(true));
    assert_eq!(result.critical_b_passed, Some(false));
    assert!(result.verdict_reason.contains("video"));
}

#[tokio::test]
async fn no_winner_leaves_pre_run_state_after_finalize() {
    let tmp = tempfile::tempdir().unwrap();
    let mut controller = FakeController::with_live("original config");
    let mut outcomes = HashMap::new();
    for target in targets() {
        outcomes.insert(target.name, Outcome::Blocked);
    }
    let prober = ScriptedProber::with_outcomes(outcomes);
    let strategies = strategies(&["s1", "s2"]);

    let mut run = orchestrate(&mut controller, &prober)
        .run(&strategies, &targets(), Mode::Full, &CancelToken::new())
        .await
        .unwrap();

    let paths = PathsConfig {
        report_dir: tmp.path().join("reports"),
        good_list_file: tmp.path().join("good.txt"),
        active_name_file: tmp.path().join("active.txt"),
        ..Default::default()
    };
    ReportGenerator::new(&paths)
        .finalize(&mut run, &strategies, &mut controller)
        .await
        .unwrap();

    assert!(run.winner.is_none());
    assert_eq!(controller.live, "original config");
    assert!(run.report_path.unwrap().exists());
}

#[tokio::test]
async fn winner_commit_leaves_winning_config_live() {
    let tmp = tempfile::tempdir().unwrap();
    let mut controller = FakeController::with_live("original config");
    let prober = ScriptedProber::all_success();
    let strategies = strategies(&["s1", "s2"]);

    let mut run = orchestrate(&mut controller, &prober)
        .run(&strategies, &targets(), Mode::Full, &CancelToken::new())
        .await
        .unwrap();

    let paths = PathsConfig {
        report_dir: tmp.path().join("reports"),
        good_list_file: tmp.path().join("good.txt"),
        active_name_file: tmp.path().join("active.txt"),
        ..Default::default()
    };
    ReportGenerator::new(&paths)
        .finalize(&mut run, &strategies, &mut controller)
        .await
        .unwrap();

    // Both score 100%; the first GOOD in rank order wins and stays applied
    let winner = run.winner.clone().unwrap();
    assert_eq!(controller.live, format!("payload of {winner}"));
    let good = std::fs::read_to_string(tmp.path().join("good.txt")).unwrap();
    assert_eq!(good.lines().count(), 2);
    let active = std::fs::read_to_string(tmp.path().join("active.txt")).unwrap();
    assert_eq!(active.trim(), winner);
}

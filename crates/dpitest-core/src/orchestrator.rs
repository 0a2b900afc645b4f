//! Evaluation orchestrator
//!
//! Drives the end-to-end run: one strategy at a time against the live
//! service, concurrent probes within each iteration, best-effort restore
//! after every iteration and again at the end. The outer loop is strictly
//! sequential because the service under test is a process-wide exclusive
//! resource; two strategies applied concurrently would corrupt both.

use std::time::Duration;

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::classifier::ResultClassifier;
use crate::error::Result;
use crate::model::{Mode, ProbeTarget, TestRun};
use crate::probe::Prober;
use crate::service::ServiceControl;
use crate::strategy::Strategy;

/// Sequential strategy evaluation loop
pub struct Orchestrator<'a, S, P> {
    controller: &'a mut S,
    prober: &'a P,
    classifier: ResultClassifier,
    stabilize_delay: Duration,
}

impl<'a, S: ServiceControl, P: Prober> Orchestrator<'a, S, P> {
    /// New orchestrator over the given service controller and prober
    pub fn new(
        controller: &'a mut S,
        prober: &'a P,
        classifier: ResultClassifier,
        stabilize_delay: Duration,
    ) -> Self {
        Self {
            controller,
            prober,
            classifier,
            stabilize_delay,
        }
    }

    /// Evaluate every strategy in input order
    ///
    /// The only fatal condition is a failed initial backup; without a
    /// known-good snapshot the run must not mutate anything. Failures local
    /// to one strategy are recorded and never stop the loop. Cancellation is
    /// cooperative: polled between strategies, with one final restore before
    /// returning.
    pub async fn run(
        &mut self,
        strategies: &[Strategy],
        targets: &[ProbeTarget],
        mode: Mode,
        cancel: &CancelToken,
    ) -> Result<TestRun> {
        let snapshot = self.controller.backup().await?;
        info!(
            strategies = strategies.len(),
            targets = targets.len(),
            %mode,
            "Starting evaluation run"
        );

        let mut run = TestRun::new(mode);
        for (index, strategy) in strategies.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(completed = run.results.len(), "Cancellation requested, stopping loop");
                run.cancelled = true;
                break;
            }

            info!(
                strategy = %strategy.name,
                position = index + 1,
                total = strategies.len(),
                "Applying strategy"
            );
            if let Err(e) = self.controller.apply(strategy).await {
                warn!(strategy = %strategy.name, error = %e, "Apply failed, skipping probes");
                run.results
                    .push(ResultClassifier::service_failure(&strategy.name, mode, &e.to_string()));
                self.controller.restore(&snapshot).await;
                continue;
            }

            // Let the restarted service settle before probing
            tokio::time::sleep(self.stabilize_delay).await;

            let probe_results = self.prober.probe_all(targets, cancel).await;
            let result = self
                .classifier
                .classify(&strategy.name, mode, targets, probe_results);
            info!(
                strategy = %strategy.name,
                verdict = result.verdict.as_str(),
                rate = format!("{:.1}", result.success_rate),
                "Strategy evaluated"
            );
            run.results.push(result);

            // Unconditional: probing outcome never changes the rollback
            self.controller.restore(&snapshot).await;
        }

        // Covers mid-iteration cancellation; harmless when already restored
        self.controller.restore(&snapshot).await;
        run.cancelled = run.cancelled || cancel.is_cancelled();
        run.snapshot = Some(snapshot);

        info!(
            evaluated = run.results.len(),
            cancelled = run.cancelled,
            "Evaluation run finished"
        );
        Ok(run)
    }
}

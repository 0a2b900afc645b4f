//! Result classification
//!
//! Turns a flat set of probe results into a per-strategy verdict. Pure and
//! deterministic: the verdict depends only on the success rate and the two
//! critical flags, checked in a fixed order where a low overall rate
//! overrides otherwise-passing critical services.

use tracing::debug;

use crate::model::{Mode, ProbeResult, ProbeTarget, StrategyResult, TargetCategory, Verdict};

/// Human names for the critical categories, used in verdict reasons
const CRITICAL_A_LABEL: &str = "messaging";
const CRITICAL_B_LABEL: &str = "video";

/// Aggregates probe results into strategy verdicts
#[derive(Debug, Clone)]
pub struct ResultClassifier {
    threshold: f64,
}

impl ResultClassifier {
    /// Classifier with the given success-rate threshold (percent)
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Classify one strategy's probe batch
    ///
    /// `targets` supplies the category partition; results are re-associated
    /// by target name. A target without a matching result counts as failed.
    pub fn classify(
        &self,
        strategy_name: &str,
        mode: Mode,
        targets: &[ProbeTarget],
        probe_results: Vec<ProbeResult>,
    ) -> StrategyResult {
        let successful_count = probe_results.iter().filter(|r| r.outcome.is_success()).count();
        let blocked_count = probe_results.iter().filter(|r| r.outcome.is_blocked()).count();
        let failed_count = probe_results.len() - successful_count - blocked_count;

        let total = targets.len();
        let success_rate = if total == 0 {
            0.0
        } else {
            successful_count as f64 / total as f64 * 100.0
        };

        let critical_a_passed = critical_flag(targets, &probe_results, TargetCategory::CriticalA);
        let critical_b_passed = critical_flag(targets, &probe_results, TargetCategory::CriticalB);

        let (verdict, verdict_reason) =
            self.verdict(success_rate, critical_a_passed, critical_b_passed);

        debug!(
            strategy = strategy_name,
            rate = format!("{success_rate:.1}"),
            ?critical_a_passed,
            ?critical_b_passed,
            verdict = verdict.as_str(),
            "Classified strategy"
        );

        StrategyResult {
            strategy_name: strategy_name.to_string(),
            mode,
            probe_results,
            successful_count,
            blocked_count,
            failed_count,
            success_rate,
            critical_a_passed,
            critical_b_passed,
            verdict,
            verdict_reason,
        }
    }

    /// Record for a strategy whose apply failed; no probing was attempted
    pub fn service_failure(strategy_name: &str, mode: Mode, detail: &str) -> StrategyResult {
        StrategyResult {
            strategy_name: strategy_name.to_string(),
            mode,
            probe_results: Vec::new(),
            successful_count: 0,
            blocked_count: 0,
            failed_count: 0,
            success_rate: 0.0,
            critical_a_passed: None,
            critical_b_passed: None,
            verdict: Verdict::Bad,
            verdict_reason: format!("service control failure: {detail}"),
        }
    }

    /// The verdict rule, in its exact order
    ///
    /// `None` means no critical target of that category was probed; it is a
    /// distinct, non-disqualifying state, not a failure.
    pub fn verdict(
        &self,
        success_rate: f64,
        critical_a_passed: Option<bool>,
        critical_b_passed: Option<bool>,
    ) -> (Verdict, String) {
        if success_rate < self.threshold {
            return (Verdict::Bad, "low effectiveness".to_string());
        }
        let a_failed = critical_a_passed == Some(false);
        let b_failed = critical_b_passed == Some(false);
        match (a_failed, b_failed) {
            (false, false) => (Verdict::Good, String::new()),
            (true, false) => (
                Verdict::Partial,
                format!("{CRITICAL_A_LABEL} service failing"),
            ),
            (false, true) => (
                Verdict::Partial,
                format!("{CRITICAL_B_LABEL} service failing"),
            ),
            (true, true) => (Verdict::Bad, "both critical services failing".to_string()),
        }
    }
}

/// `Some(true)` iff every target of the category present succeeded; `None`
/// when the category is absent from this run
fn critical_flag(
    targets: &[ProbeTarget],
    results: &[ProbeResult],
    category: TargetCategory,
) -> Option<bool> {
    let mut present = false;
    let mut all_passed = true;
    for target in targets.iter().filter(|t| t.category == category) {
        present = true;
        let passed = results
            .iter()
            .find(|r| r.target_name == target.name)
            .map(|r| r.outcome.is_success())
            .unwrap_or(false);
        all_passed &= passed;
    }
    present.then_some(all_passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Endpoint, Outcome};

    fn target(name: &str, category: TargetCategory) -> ProbeTarget {
        ProbeTarget {
            name: name.to_string(),
            endpoint: Endpoint::url(format!("https://{name}.example"), None),
            category,
        }
    }

    fn result(name: &str, outcome: Outcome) -> ProbeResult {
        ProbeResult::new(name, outcome, None, "")
    }

    fn classifier() -> ResultClassifier {
        ResultClassifier::new(60.0)
    }

    #[test]
    fn test_all_success_is_good() {
        // Scenario A: 5/5 successful, both critical flags true
        let targets = vec![
            target("d1", TargetCategory::CriticalA),
            target("d2", TargetCategory::CriticalA),
            target("y1", TargetCategory::CriticalB),
            target("o1", TargetCategory::Other),
            target("o2", TargetCategory::Other),
        ];
        let results = targets
            .iter()
            .map(|t| result(&t.name, Outcome::Success))
            .collect();
        let sr = classifier().classify("X", Mode::Full, &targets, results);
        assert_eq!(sr.verdict, Verdict::Good);
        assert!(sr.verdict_reason.is_empty());
        assert_eq!(sr.success_rate, 100.0);
        assert_eq!(sr.critical_a_passed, Some(true));
        assert_eq!(sr.critical_b_passed, Some(true));
    }

    #[test]
    fn test_one_critical_failing_is_partial() {
        // Scenario B: 3/5 (60%), A passes, B fails
        let targets = vec![
            target("d1", TargetCategory::CriticalA),
            target("d2", TargetCategory::CriticalA),
            target("y1", TargetCategory::CriticalB),
            target("y2", TargetCategory::CriticalB),
            target("o1", TargetCategory::Other),
        ];
        let results = vec![
            result("d1", Outcome::Success),
            result("d2", Outcome::Success),
            result("y1", Outcome::Blocked),
            result("y2", Outcome::Blocked),
            result("o1", Outcome::Success),
        ];
        let sr = classifier().classify("Y", Mode::Full, &targets, results);
        assert_eq!(sr.success_rate, 60.0);
        assert_eq!(sr.verdict, Verdict::Partial);
        assert!(sr.verdict_reason.contains(CRITICAL_B_LABEL));
    }

    #[test]
    fn test_low_rate_overrides_critical_flags() {
        // Scenario C: 40% even with both criticals passing
        let (verdict, reason) = classifier().verdict(40.0, Some(true), Some(true));
        assert_eq!(verdict, Verdict::Bad);
        assert_eq!(reason, "low effectiveness");
    }

    #[test]
    fn test_both_critical_failing_is_bad() {
        let (verdict, reason) = classifier().verdict(80.0, Some(false), Some(false));
        assert_eq!(verdict, Verdict::Bad);
        assert_eq!(reason, "both critical services failing");
    }

    #[test]
    fn test_absent_category_not_disqualifying() {
        // No critical-B target probed at all: None, not false
        let (verdict, _) = classifier().verdict(90.0, Some(true), None);
        assert_eq!(verdict, Verdict::Good);
        let (verdict, _) = classifier().verdict(90.0, None, None);
        assert_eq!(verdict, Verdict::Good);
    }

    #[test]
    fn test_critical_flag_null_vs_false() {
        let targets = vec![target("o1", TargetCategory::Other)];
        let results = vec![result("o1", Outcome::Success)];
        assert_eq!(
            critical_flag(&targets, &results, TargetCategory::CriticalA),
            None
        );

        let targets = vec![target("d1", TargetCategory::CriticalA)];
        let results = vec![result("d1", Outcome::Blocked)];
        assert_eq!(
            critical_flag(&targets, &results, TargetCategory::CriticalA),
            Some(false)
        );
    }

    #[test]
    fn test_missing_result_counts_as_failed() {
        let targets = vec![target("d1", TargetCategory::CriticalA)];
        assert_eq!(
            critical_flag(&targets, &[], TargetCategory::CriticalA),
            Some(false)
        );
    }

    #[test]
    fn test_empty_run_rate_is_zero() {
        let sr = classifier().classify("Z", Mode::Full, &[], Vec::new());
        assert_eq!(sr.success_rate, 0.0);
        assert_eq!(sr.verdict, Verdict::Bad);
    }

    #[test]
    fn test_service_failure_record() {
        let sr = ResultClassifier::service_failure("W", Mode::Full, "start timed out");
        assert_eq!(sr.verdict, Verdict::Bad);
        assert!(sr.probe_results.is_empty());
        assert!(sr.verdict_reason.contains("service control failure"));
        assert_eq!(sr.critical_a_passed, None);
    }

    #[test]
    fn test_classify_idempotent() {
        let targets = vec![
            target("d1", TargetCategory::CriticalA),
            target("o1", TargetCategory::Other),
        ];
        let results: Vec<ProbeResult> = vec![
            result("d1", Outcome::Success),
            result("o1", Outcome::Blocked),
        ];
        let a = classifier().classify("S", Mode::Full, &targets, results.clone());
        let b = classifier().classify("S", Mode::Full, &targets, results);
        assert_eq!(a.verdict, b.verdict);
        assert_eq!(a.verdict_reason, b.verdict_reason);
        assert_eq!(a.success_rate, b.success_rate);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn rate_always_in_bounds(successes in 0usize..50, extras in 0usize..50) {
                let total = successes + extras;
                let targets: Vec<ProbeTarget> = (0..total)
                    .map(|i| target(&format!("t{i}"), TargetCategory::Other))
                    .collect();
                let results: Vec<ProbeResult> = targets
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let outcome = if i < successes { Outcome::Success } else { Outcome::Blocked };
                        result(&t.name, outcome)
                    })
                    .collect();
                let sr = classifier().classify("p", Mode::Full, &targets, results);
                prop_assert!((0.0..=100.0).contains(&sr.success_rate));
                if total > 0 {
                    let expected = successes as f64 / total as f64 * 100.0;
                    prop_assert!((sr.success_rate - expected).abs() < 1e-9);
                }
            }

            #[test]
            fn verdict_deterministic(rate in 0.0f64..100.0, a in prop::option::of(any::<bool>()), b in prop::option::of(any::<bool>())) {
                let c = classifier();
                prop_assert_eq!(c.verdict(rate, a, b), c.verdict(rate, a, b));
            }
        }
    }
}

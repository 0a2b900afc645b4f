//! Winner selection, persistence and report rendering
//!
//! Consumes a finished test run read-only, picks the winning strategy,
//! commits it (the one apply that is deliberately not followed by a
//! restore), persists the GOOD list and the active-strategy record, and
//! renders a static HTML report with a timestamped filename.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::PathsConfig;
use crate::error::{Error, Result};
use crate::model::{StrategyResult, TestRun, Verdict};
use crate::service::ServiceControl;
use crate::strategy::Strategy;

/// Results partitioned by verdict, each bucket sorted by success rate
/// descending
#[derive(Debug, Default)]
pub struct RankedResults<'r> {
    /// GOOD strategies, best first
    pub good: Vec<&'r StrategyResult>,
    /// PARTIAL strategies, best first
    pub partial: Vec<&'r StrategyResult>,
    /// BAD strategies, best first
    pub bad: Vec<&'r StrategyResult>,
}

impl<'r> RankedResults<'r> {
    /// Partition and sort a result set
    pub fn rank(results: &'r [StrategyResult]) -> Self {
        let mut ranked = Self::default();
        for result in results {
            match result.verdict {
                Verdict::Good => ranked.good.push(result),
                Verdict::Partial => ranked.partial.push(result),
                Verdict::Bad => ranked.bad.push(result),
            }
        }
        let by_rate_desc = |a: &&StrategyResult, b: &&StrategyResult| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(Ordering::Equal)
        };
        ranked.good.sort_by(by_rate_desc);
        ranked.partial.sort_by(by_rate_desc);
        ranked.bad.sort_by(by_rate_desc);
        ranked
    }

    /// Best GOOD result, else best PARTIAL, else none
    pub fn winner(&self) -> Option<&'r StrategyResult> {
        self.good.first().or_else(|| self.partial.first()).copied()
    }
}

/// Renders reports and commits the winning strategy
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    report_dir: PathBuf,
    good_list_file: PathBuf,
    active_name_file: PathBuf,
}

impl ReportGenerator {
    /// Generator writing to the configured locations
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            report_dir: paths.report_dir.clone(),
            good_list_file: paths.good_list_file.clone(),
            active_name_file: paths.active_name_file.clone(),
        }
    }

    /// Select, commit and report
    ///
    /// On success `run.winner` names the committed strategy and
    /// `run.report_path` points at the rendered artifact. When the winning
    /// apply fails the system stays in its restored pre-run state and no
    /// winner is recorded.
    pub async fn finalize<S: ServiceControl>(
        &self,
        run: &mut TestRun,
        strategies: &[Strategy],
        controller: &mut S,
    ) -> Result<()> {
        let ranked = RankedResults::rank(&run.results);

        if let Some(best) = ranked.winner() {
            let name = best.strategy_name.clone();
            match strategies.iter().find(|s| s.name == name) {
                Some(strategy) => match controller.apply(strategy).await {
                    Ok(()) => {
                        info!(winner = %name, rate = format!("{:.1}", best.success_rate), "Winner committed");
                        self.write_active_name(&name)?;
                        run.winner = Some(name);
                    }
                    Err(e) => {
                        // The per-iteration restore already put the snapshot back
                        error!(winner = %name, error = %e, "Failed to commit winner, system left in pre-run state");
                    }
                },
                None => warn!(winner = %name, "Winning strategy not among loaded strategies"),
            }
        } else {
            info!("No working strategy found, system left in pre-run state");
        }

        self.write_good_list(&ranked)?;

        let html = render_html(run, &ranked);
        let path = self.report_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config_io(parent.display().to_string(), e.to_string()))?;
        }
        std::fs::write(&path, html)
            .map_err(|e| Error::config_io(path.display().to_string(), e.to_string()))?;
        info!(path = %path.display(), "Report written");
        run.report_path = Some(path);

        Ok(())
    }

    fn report_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        self.report_dir.join(format!("dpitest-report-{stamp}.html"))
    }

    /// Persist all GOOD strategy names, best first, for reuse by later runs
    fn write_good_list(&self, ranked: &RankedResults<'_>) -> Result<()> {
        let mut content = String::new();
        for result in &ranked.good {
            content.push_str(&result.strategy_name);
            content.push('\n');
        }
        write_record(&self.good_list_file, &content)
    }

    fn write_active_name(&self, name: &str) -> Result<()> {
        write_record(&self.active_name_file, &format!("{name}\n"))
    }
}

fn write_record(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config_io(parent.display().to_string(), e.to_string()))?;
        }
    }
    std::fs::write(path, content)
        .map_err(|e| Error::config_io(path.display().to_string(), e.to_string()))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the whole run as a self-contained HTML document
fn render_html(run: &TestRun, ranked: &RankedResults<'_>) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>dpitest report</title>\n<style>\n");
    html.push_str(
        "body{font-family:sans-serif;margin:2em;background:#fafafa}\
         table{border-collapse:collapse;margin:0.5em 0 1.5em}\
         th,td{border:1px solid #ccc;padding:4px 10px;text-align:left}\
         th{background:#eee}\
         .good{color:#1a7f37}.partial{color:#9a6700}.bad{color:#cf222e}\
         .winner{background:#dafbe1}\n",
    );
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str(&format!(
        "<h1>Strategy evaluation report</h1>\n<p>Generated {} UTC &middot; mode: {} &middot; {} strategies evaluated{}</p>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        escape(run.mode.as_str()),
        run.results.len(),
        if run.cancelled { " &middot; run cancelled early" } else { "" },
    ));

    match &run.winner {
        Some(name) => html.push_str(&format!(
            "<p class=\"winner\"><strong>Winner:</strong> {} (committed as the active configuration)</p>\n",
            escape(name)
        )),
        None => html.push_str(
            "<p><strong>No winner.</strong> The pre-run configuration was restored.</p>\n",
        ),
    }

    for (title, class, bucket) in [
        ("GOOD", "good", &ranked.good),
        ("PARTIAL", "partial", &ranked.partial),
        ("BAD", "bad", &ranked.bad),
    ] {
        html.push_str(&format!(
            "<h2 class=\"{class}\">{title} ({})</h2>\n",
            bucket.len()
        ));
        if bucket.is_empty() {
            html.push_str("<p>none</p>\n");
            continue;
        }
        html.push_str(
            "<table>\n<tr><th>Strategy</th><th>Success rate</th><th>OK</th><th>Blocked</th>\
             <th>Failed</th><th>Critical A</th><th>Critical B</th><th>Reason</th></tr>\n",
        );
        for result in bucket.iter() {
            let winner_class = match &run.winner {
                Some(name) if *name == result.strategy_name => " class=\"winner\"",
                _ => "",
            };
            html.push_str(&format!(
                "<tr{}><td>{}</td><td>{:.1}%</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                winner_class,
                escape(&result.strategy_name),
                result.success_rate,
                result.successful_count,
                result.blocked_count,
                result.failed_count,
                flag_label(result.critical_a_passed),
                flag_label(result.critical_b_passed),
                escape(&result.verdict_reason),
            ));
        }
        html.push_str("</table>\n");

        for result in bucket.iter().filter(|r| !r.probe_results.is_empty()) {
            html.push_str(&format!(
                "<details><summary>{} &mdash; per-target detail</summary>\n<table>\n\
                 <tr><th>Target</th><th>Outcome</th><th>Protocol</th><th>Detail</th></tr>\n",
                escape(&result.strategy_name)
            ));
            for probe in &result.probe_results {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    escape(&probe.target_name),
                    probe.outcome.label(),
                    probe.protocol.map(|p| p.as_str()).unwrap_or("-"),
                    escape(&probe.detail),
                ));
            }
            html.push_str("</table>\n</details>\n");
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn flag_label(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "pass",
        Some(false) => "fail",
        None => "n/a",
    }
}

//! Probe outcome classification
//!
//! Pure functions mapping one attempt's observable output (reported HTTP
//! code, captured error text, exit status) onto the three-way `Outcome`.
//! The rules are ordered; the first matching rule wins.

use crate::model::{InconclusiveReason, Outcome};

/// HTTP status codes accepted as proof of reachability
///
/// 403/404/405 still prove the TCP+TLS path works; DPI interference shows up
/// as resets and handshake failures, not as well-formed error pages.
pub fn is_accepted_code(code: u16) -> bool {
    matches!(code, 200 | 204 | 301..=308 | 403 | 404 | 405)
}

const SSL_MARKERS: [&str; 4] = ["ssl", "certificate", "handshake", "tls alert"];
// No bare "rst" token: it would match inside hostnames like "first-..."
const RESET_MARKERS: [&str; 3] = [
    "connection reset",
    "reset by peer",
    "recv failure",
];
const DNS_MARKERS: [&str; 3] = [
    "could not resolve",
    "name or service not known",
    "unknown host",
];
const TIMEOUT_MARKERS: [&str; 3] = ["timed out", "timeout", "operation too slow"];

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| haystack.contains(m))
}

/// Classify one URL probe attempt
///
/// `http_code` is the code reported by the checker (`None` when no response
/// arrived), `error_text` the captured stderr, `expect` the per-target
/// expected-code override. With an override in place the override replaces
/// the generic accepted set entirely.
pub fn classify_url_attempt(
    http_code: Option<u16>,
    error_text: &str,
    expect: Option<u16>,
) -> (Outcome, String) {
    if let Some(code) = http_code {
        let accepted = match expect {
            Some(expected) => code == expected,
            None => is_accepted_code(code),
        };
        if accepted {
            return (Outcome::Success, format!("HTTP {code}"));
        }
    }

    let text = error_text.to_lowercase();
    if contains_any(&text, &SSL_MARKERS) {
        return (Outcome::Blocked, excerpt("TLS interference", error_text));
    }
    if contains_any(&text, &RESET_MARKERS) {
        return (Outcome::Blocked, excerpt("connection reset", error_text));
    }
    if contains_any(&text, &DNS_MARKERS) {
        return (
            Outcome::Inconclusive(InconclusiveReason::Dns),
            excerpt("DNS failure", error_text),
        );
    }
    if contains_any(&text, &TIMEOUT_MARKERS) {
        return (
            Outcome::Inconclusive(InconclusiveReason::Timeout),
            excerpt("timed out", error_text),
        );
    }

    let detail = match (http_code, expect) {
        (Some(code), Some(expected)) => format!("HTTP {code} (expected {expected})"),
        (Some(code), None) => format!("unexpected HTTP {code}"),
        _ => excerpt("no response", error_text),
    };
    (Outcome::Inconclusive(InconclusiveReason::Unknown), detail)
}

/// Classify one ping attempt
///
/// Success requires both a clean exit and an echo reply carrying a TTL
/// marker; some ping builds exit 0 on "destination unreachable".
pub fn classify_ping(exit_ok: bool, output: &str) -> (Outcome, String) {
    let text = output.to_lowercase();
    if exit_ok && text.contains("ttl=") {
        return (Outcome::Success, "echo reply received".to_string());
    }
    if contains_any(&text, &DNS_MARKERS) || text.contains("could not find host") {
        return (
            Outcome::Inconclusive(InconclusiveReason::Dns),
            "host name resolution failed".to_string(),
        );
    }
    if contains_any(&text, &TIMEOUT_MARKERS)
        || text.contains("100% packet loss")
        || text.contains("unreachable")
    {
        return (
            Outcome::Inconclusive(InconclusiveReason::Timeout),
            "no echo reply".to_string(),
        );
    }
    (
        Outcome::Inconclusive(InconclusiveReason::Unknown),
        excerpt("ping failed", output),
    )
}

/// Keep details short: a label plus the first non-empty line of raw output
fn excerpt(label: &str, raw: &str) -> String {
    match raw.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => {
            let mut line = line.to_string();
            if line.len() > 120 {
                line.truncate(120);
            }
            format!("{label}: {line}")
        }
        None => label.to_string(),
    }
}

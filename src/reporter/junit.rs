//! JUnit XML Reporter
//!
//! Generates JUnit XML output format for CI/CD integration.
//! One testcase per verdict: FAIL maps to `<failure>`, ERROR to `<error>`,
//! SKIPPED to `<skipped/>`. WARN verdicts pass with a `<system-out>` note.

use crate::fuzzer::verdict::{Verdict, VerdictKind};
use crate::fuzzer::FuzzResults;

/// Generate JUnit XML output from fuzzing results
pub fn generate_junit(results: &FuzzResults) -> String {
    let mut xml = String::new();
    let summary = &results.summary;

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\">\n",
        escape_xml(&results.target),
        summary.total,
        summary.failed,
        summary.errors,
        summary.skipped,
        results.duration_ms as f64 / 1000.0
    ));

    for verdict in &results.verdicts {
        push_testcase(&mut xml, verdict);
    }

    xml.push_str("</testsuite>\n");
    xml
}

fn push_testcase(xml: &mut String, verdict: &Verdict) {
    let time: u64 = verdict.attempts.iter().map(|a| a.elapsed_ms).sum();
    xml.push_str(&format!(
        "  <testcase name=\"{}\" classname=\"contractfuzz.{}\" time=\"{:.3}\"",
        escape_xml(&format!("{} {}", verdict.operation, verdict.scenario)),
        verdict.fuzzer.replace('-', "_"),
        time as f64 / 1000.0
    ));

    match verdict.kind {
        VerdictKind::Pass => {
            xml.push_str("/>\n");
            return;
        }
        VerdictKind::Skipped => {
            xml.push_str(">\n");
            xml.push_str(&format!(
                "    <skipped message=\"{}\"/>\n",
                escape_xml(&truncate(&verdict.diagnostic, 200))
            ));
        }
        VerdictKind::Warn => {
            xml.push_str(">\n");
            xml.push_str(&format!(
                "    <system-out>{}</system-out>\n",
                escape_xml(&verdict.diagnostic)
            ));
        }
        VerdictKind::Fail | VerdictKind::Error => {
            let element = if verdict.kind == VerdictKind::Fail {
                "failure"
            } else {
                "error"
            };
            xml.push_str(">\n");
            xml.push_str(&format!(
                "    <{} message=\"{}\" type=\"{}\">\n",
                element,
                escape_xml(&truncate(&verdict.diagnostic, 200)),
                verdict.kind
            ));
            xml.push_str(&escape_xml(&details(verdict)));
            xml.push_str(&format!("    </{}>\n", element));
        }
    }

    xml.push_str("  </testcase>\n");
}

/// Plain-text body of a failure or error element
fn details(verdict: &Verdict) -> String {
    let mut text = String::new();
    text.push_str(&format!("Operation: {}\n", verdict.operation));
    text.push_str(&format!("Target: {}\n", verdict.target));
    text.push_str(&format!("Strategy: {}\n", verdict.strategy));
    text.push_str(&format!("Expected: {}\n", verdict.expected));
    match verdict.response_code {
        Some(code) => text.push_str(&format!("Actual: {}\n", code)),
        None => text.push_str("Actual: no response\n"),
    }
    text.push_str(&format!("Diagnostic: {}\n", verdict.diagnostic));

    if verdict.attempts.len() > 1 {
        text.push_str("\nAttempts:\n");
        for attempt in &verdict.attempts {
            let status = attempt
                .response_code
                .map_or_else(|| "-".to_string(), |c| c.to_string());
            text.push_str(&format!(
                "- {} {} {}\n",
                attempt.location, status, attempt.kind
            ));
        }
    }
    text
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Truncate string to max characters with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

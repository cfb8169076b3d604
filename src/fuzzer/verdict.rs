//! Verdicts - Terminal outcome of executing one fuzzing unit

use serde::Serialize;

use super::family::ResponseCodeFamily;
use super::unit::FuzzingUnit;

/// Classification of an executed unit, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictKind {
    Pass,
    Skipped,
    Warn,
    Fail,
    Error,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Skipped => "SKIPPED",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }

    /// FAIL and ERROR make a run unsuccessful
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One request sent on behalf of a unit
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    /// Concrete location that was mutated
    pub location: String,
    /// Status returned, `None` on transport failure
    pub response_code: Option<u16>,
    pub kind: VerdictKind,
    pub detail: String,
    pub elapsed_ms: u64,
}

/// Immutable outcome of one fuzzing unit
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub unit_id: String,
    pub fuzzer: String,
    pub scenario: String,
    /// `METHOD /path`
    pub operation: String,
    /// Field path, header name, or `request`
    pub target: String,
    pub strategy: String,
    pub expected: ResponseCodeFamily,
    /// Status of the most severe attempt
    pub response_code: Option<u16>,
    /// Whether every response status was in the expected family
    pub matched: bool,
    pub kind: VerdictKind,
    pub diagnostic: String,
    pub attempts: Vec<Attempt>,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl Verdict {
    fn base(unit: &FuzzingUnit, kind: VerdictKind, diagnostic: String) -> Self {
        Self {
            unit_id: unit.id.clone(),
            fuzzer: unit.fuzzer.clone(),
            scenario: unit.scenario.clone(),
            operation: unit.operation.label(),
            target: unit.target.to_string(),
            strategy: unit.strategy.describe(),
            expected: unit.expected,
            response_code: None,
            matched: false,
            kind,
            diagnostic,
            attempts: Vec::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Informational verdict for a unit that sent nothing
    pub fn skipped(unit: &FuzzingUnit, reason: impl Into<String>) -> Self {
        Self::base(unit, VerdictKind::Skipped, reason.into())
    }

    /// Aggregate the attempts of a unit; the most severe attempt wins
    pub fn from_attempts(unit: &FuzzingUnit, attempts: Vec<Attempt>) -> Self {
        let matched = !attempts.is_empty()
            && attempts
                .iter()
                .all(|a| a.response_code.is_some_and(|code| unit.expected.accepts(code)));

        let worst = attempts
            .iter()
            .enumerate()
            .max_by_key(|(index, attempt)| (attempt.kind, std::cmp::Reverse(*index)))
            .map(|(_, attempt)| attempt.clone());

        let Some(worst) = worst else {
            return Self::skipped(unit, "no request was sent");
        };

        let diagnostic = if attempts.len() > 1 {
            let affected = attempts.iter().filter(|a| a.kind == worst.kind).count();
            format!(
                "{} ({} of {} requests, first at {})",
                worst.detail,
                affected,
                attempts.len(),
                worst.location
            )
        } else {
            worst.detail.clone()
        };

        let mut verdict = Self::base(unit, worst.kind, diagnostic);
        verdict.response_code = worst.response_code;
        verdict.matched = matched;
        verdict.attempts = attempts;
        verdict
    }
}

/// Running counts per verdict kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerdictSummary {
    pub total: usize,
    pub passed: usize,
    pub warnings: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: usize,
}

impl VerdictSummary {
    pub fn record(&mut self, verdict: &Verdict) {
        self.total += 1;
        match verdict.kind {
            VerdictKind::Pass => self.passed += 1,
            VerdictKind::Warn => self.warnings += 1,
            VerdictKind::Skipped => self.skipped += 1,
            VerdictKind::Fail => self.failed += 1,
            VerdictKind::Error => self.errors += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.errors > 0
    }
}

//! Indicator Detection - Scan response bodies for signs of unsafe processing
//!
//! Security-oriented units send attacker-controlled input. A response that
//! leaks database errors, schema metadata or stack traces, or that reflects
//! the injected payload verbatim, shows the input reached somewhere it should
//! not have, whatever the status code says.

use regex::Regex;
use serde::Serialize;

/// Security concern a unit is probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCheck {
    SqlInjection,
    Xss,
    CommandInjection,
    /// Only crash and stack-trace markers
    Generic,
}

impl SecurityCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::Xss => "xss",
            Self::CommandInjection => "command_injection",
            Self::Generic => "generic",
        }
    }

    fn watches(&self, kind: IndicatorKind) -> bool {
        match kind {
            IndicatorKind::StackTrace | IndicatorKind::Crash => true,
            IndicatorKind::SqlError | IndicatorKind::SchemaLeak => *self == Self::SqlInjection,
            IndicatorKind::CommandOutput => *self == Self::CommandInjection,
            IndicatorKind::Reflection => *self == Self::Xss,
        }
    }
}

impl std::fmt::Display for SecurityCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of leak found in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    SqlError,
    SchemaLeak,
    StackTrace,
    Crash,
    CommandOutput,
    Reflection,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlError => "SQL error message",
            Self::SchemaLeak => "database schema metadata",
            Self::StackTrace => "stack trace",
            Self::Crash => "crash marker",
            Self::CommandOutput => "command output",
            Self::Reflection => "unsanitized reflection of the payload",
        }
    }
}

/// A positive indicator match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub kind: IndicatorKind,
    /// Name of the pattern that matched
    pub pattern: &'static str,
    /// Matched text, truncated
    pub evidence: String,
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "response contains {}: {:?}", self.kind.as_str(), self.evidence)
    }
}

const SQL_ERROR_KEYWORDS: &[&str] = &[
    "sql syntax",
    "syntax error",
    "unclosed quotation",
    "unterminated string",
    "unexpected end of sql",
    "invalid query",
    "database error",
    "db error",
    "query failed",
    "sql error",
    "warning: mysql",
    "warning: pg_",
    "warning: oci_",
    "supplied argument is not a valid",
    "microsoft sql",
    "sqlstate",
];

const SCHEMA_KEYWORDS: &[&str] = &[
    "information_schema",
    "sys.tables",
    "syscolumns",
    "pg_catalog",
    "pg_class",
    "sqlite_master",
    "mysql.user",
    "table_schema",
    "column_name",
];

const CRASH_MARKERS: &[&str] = &[
    "out of memory",
    "assertion failed",
    "SIGSEGV",
    "segmentation fault",
    "null pointer",
    "NullPointerException",
];

const EVIDENCE_LEN: usize = 80;

struct CompiledPattern {
    name: &'static str,
    regex: Regex,
    kind: IndicatorKind,
}

/// Response-body scanner with pre-compiled patterns
pub struct IndicatorDetector {
    patterns: Vec<CompiledPattern>,
}

impl IndicatorDetector {
    /// Create a detector with the built-in patterns
    pub fn new() -> Self {
        let keyword_pattern = |words: &[&str]| {
            let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
            format!("(?i)({})", alternatives.join("|"))
        };

        let patterns = vec![
            ("sql_error", keyword_pattern(SQL_ERROR_KEYWORDS), IndicatorKind::SqlError),
            ("schema_metadata", keyword_pattern(SCHEMA_KEYWORDS), IndicatorKind::SchemaLeak),
            (
                "stack_trace",
                r"(?i)(stack ?trace|stack backtrace|panicked at|traceback \(most recent call last\)|exception in thread)"
                    .to_string(),
                IndicatorKind::StackTrace,
            ),
            (
                "java_frame",
                r"\bat [\w$.]+\([\w$]+\.java:\d+\)".to_string(),
                IndicatorKind::StackTrace,
            ),
            ("crash_marker", keyword_pattern(CRASH_MARKERS), IndicatorKind::Crash),
            (
                "passwd_contents",
                r"root:[x*]?:0:0:".to_string(),
                IndicatorKind::CommandOutput,
            ),
            (
                "id_output",
                r"uid=\d+\([\w-]+\) gid=\d+".to_string(),
                IndicatorKind::CommandOutput,
            ),
        ];

        let patterns = patterns
            .into_iter()
            .filter_map(|(name, pattern, kind)| {
                Regex::new(&pattern)
                    .ok()
                    .map(|regex| CompiledPattern { name, regex, kind })
            })
            .collect();

        Self { patterns }
    }

    /// Scan a response body for indicators relevant to `check`
    ///
    /// Echoes of the injected payload are stripped before pattern matching so
    /// a validation message quoting the input does not count as a leak. For
    /// reflection-sensitive checks the verbatim echo is itself the indicator.
    pub fn scan(&self, body: &str, check: SecurityCheck, injected: Option<&str>) -> Option<Indicator> {
        let injected = injected.filter(|p| !p.is_empty());

        if let Some(payload) = injected {
            let escaped = json_escaped(payload);
            let reflected = body.contains(payload)
                || escaped.as_deref().is_some_and(|escaped| body.contains(escaped));
            if check.watches(IndicatorKind::Reflection) && reflected {
                return Some(Indicator {
                    kind: IndicatorKind::Reflection,
                    pattern: "verbatim_reflection",
                    evidence: truncate(payload),
                });
            }
        }

        let cleaned = match injected {
            Some(payload) => strip_echoes(body, payload),
            None => body.to_string(),
        };

        self.patterns
            .iter()
            .filter(|p| check.watches(p.kind))
            .find_map(|p| {
                p.regex.find(&cleaned).map(|m| Indicator {
                    kind: p.kind,
                    pattern: p.name,
                    evidence: truncate(m.as_str()),
                })
            })
    }
}

impl Default for IndicatorDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// The payload as it appears inside a JSON string, when escaping changes it
fn json_escaped(payload: &str) -> Option<String> {
    let encoded = serde_json::to_string(payload).ok()?;
    let inner = encoded.strip_prefix('"')?.strip_suffix('"')?;
    (!inner.is_empty() && inner != payload).then(|| inner.to_string())
}

fn strip_echoes(body: &str, payload: &str) -> String {
    let mut cleaned = body.replace(payload, "");
    if let Some(escaped) = json_escaped(payload) {
        cleaned = cleaned.replace(&escaped, "");
    }
    cleaned
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= EVIDENCE_LEN {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(EVIDENCE_LEN).collect::<String>())
    }
}

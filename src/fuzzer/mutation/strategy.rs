//! Mutation Strategy - Structural edits applied to a resolved location
//!
//! The set is closed: every fuzzer is a pairing of a value producer with one
//! of these strategies.

use serde::Serialize;
use serde_json::Value;

/// Mutation strategies for fuzzing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", content = "value", rename_all = "kebab-case")]
pub enum MutationStrategy {
    /// Overwrite the value at the location
    Replace(Value),
    /// Concatenate before the existing value (stringified first)
    Prefix(String),
    /// Concatenate after the existing value (stringified first)
    Trail(String),
    /// Delete the key or element
    Remove,
    /// Emit the terminal key a second time with this value;
    /// duplicates the element when the location is inside an array
    DuplicateKey(Value),
    /// Insert characters into the terminal key name, value untouched
    KeyInsert(String),
    /// Add an undeclared member to the object at the location
    NewKey { name: String, value: Value },
    /// Not applicable; the reason is surfaced but nothing is sent
    Skip(String),
    /// Send the baseline unchanged
    NoOp,
}

impl MutationStrategy {
    /// Short name used in reports and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace(_) => "replace",
            Self::Prefix(_) => "prefix",
            Self::Trail(_) => "trail",
            Self::Remove => "remove",
            Self::DuplicateKey(_) => "duplicate-key",
            Self::KeyInsert(_) => "key-insert",
            Self::NewKey { .. } => "new-key",
            Self::Skip(_) => "skip",
            Self::NoOp => "no-op",
        }
    }

    /// Whether executing this strategy sends a request
    pub fn sends_request(&self) -> bool {
        !matches!(self, Self::Skip(_))
    }

    /// Whether the strategy edits the document (as opposed to replaying it)
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Skip(_) | Self::NoOp)
    }

    /// Human-readable description of the edit, values truncated
    pub fn describe(&self) -> String {
        match self {
            Self::Replace(value) => format!("replace with {}", preview(value)),
            Self::Prefix(text) => format!("prefix with {:?}", truncate(text)),
            Self::Trail(text) => format!("append {:?}", truncate(text)),
            Self::Remove => "remove".to_string(),
            Self::DuplicateKey(value) => format!("duplicate key with {}", preview(value)),
            Self::KeyInsert(chars) => format!("insert {:?} into key name", chars),
            Self::NewKey { name, value } => format!("add key '{}' = {}", name, preview(value)),
            Self::Skip(reason) => format!("skip: {}", reason),
            Self::NoOp => "unchanged".to_string(),
        }
    }
}

impl std::fmt::Display for MutationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const PREVIEW_LEN: usize = 40;

fn truncate(text: &str) -> String {
    if text.chars().count() <= PREVIEW_LEN {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{}...", head)
    }
}

fn preview(value: &Value) -> String {
    truncate(&value.to_string())
}

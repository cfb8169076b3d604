//! Fuzzing Units - One test intent, consumed once by the executor

use std::sync::Arc;

use serde_json::Value;

use crate::contract::Operation;

use super::detection::SecurityCheck;
use super::family::ResponseCodeFamily;
use super::mutation::strategy::MutationStrategy;
use super::path::FieldPath;

/// What a unit mutates
#[derive(Debug, Clone, PartialEq)]
pub enum UnitTarget {
    /// A field of the JSON body, fanned out over arrays
    Field(FieldPath),
    /// A request header, by name
    Header(String),
    /// The request as a whole (body root, or nothing for NO-OP)
    Request,
}

impl std::fmt::Display for UnitTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(path) => write!(f, "{}", path),
            Self::Header(name) => write!(f, "header {}", name),
            Self::Request => write!(f, "request"),
        }
    }
}

/// A single fuzzing test: baseline, target, strategy and expected outcome
#[derive(Debug, Clone)]
pub struct FuzzingUnit {
    pub id: String,
    /// Name of the fuzzer that planned the unit
    pub fuzzer: String,
    /// Human-readable intent, e.g. "send boundary value for field age"
    pub scenario: String,
    pub operation: Arc<Operation>,
    /// Shared baseline body, never mutated
    pub baseline: Arc<Value>,
    pub target: UnitTarget,
    pub strategy: MutationStrategy,
    pub expected: ResponseCodeFamily,
    /// Scan responses for leak indicators
    pub security: Option<SecurityCheck>,
}

impl FuzzingUnit {
    pub fn new(
        fuzzer: impl Into<String>,
        operation: Arc<Operation>,
        target: UnitTarget,
        strategy: MutationStrategy,
        expected: ResponseCodeFamily,
    ) -> Self {
        let scenario = format!("{} {}", strategy.describe(), target);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fuzzer: fuzzer.into(),
            scenario,
            baseline: Arc::clone(&operation.payload),
            operation,
            target,
            strategy,
            expected,
            security: None,
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    pub fn with_security(mut self, check: SecurityCheck) -> Self {
        self.security = Some(check);
        self
    }

    /// Use a different baseline body than the operation's example
    pub fn with_baseline(mut self, baseline: Arc<Value>) -> Self {
        self.baseline = baseline;
        self
    }
}

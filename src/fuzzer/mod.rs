//! Fuzz Engine - Contract-driven fuzzing for HTTP APIs
//!
//! A contract operation is planned into fuzzing units (one per field or
//! header, per fuzzer, per generated value), each unit runs through the
//! executor state machine, and every executed unit yields one verdict.

pub mod config;
pub mod detection;
pub mod executor;
pub mod family;
pub mod generator;
pub mod iterator;
pub mod limits;
pub mod mutation;
pub mod path;
pub mod session;
pub mod suite;
pub mod unit;
pub mod verdict;

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::contract::Contract;
use crate::reporter::Report;
use crate::transport::HttpTransport;

pub use config::{FuzzConfig, FuzzProfile};
pub use executor::Executor;
pub use family::ResponseCodeFamily;
pub use limits::{FuzzerError, StopReason};
pub use session::FuzzSession;
pub use verdict::{Verdict, VerdictKind, VerdictSummary};

/// Fuzzing session results
#[derive(Debug, Clone, Serialize)]
pub struct FuzzResults {
    /// Service under test
    pub target: String,
    pub duration_ms: u64,
    pub summary: VerdictSummary,
    /// Set when the run ended before every unit was scheduled
    pub stop_reason: Option<StopReason>,
    /// Verdicts in unit order
    pub verdicts: Vec<Verdict>,
}

impl FuzzResults {
    pub fn has_failures(&self) -> bool {
        self.summary.has_failures()
    }

    pub fn print_text(&self) {
        use colored::Colorize;

        println!("{}", "Fuzzing Results".cyan().bold());
        println!("{}", "=".repeat(50));
        println!();

        println!("Target: {}", self.target);
        println!("Duration: {:.1}s", self.duration_ms as f64 / 1000.0);
        if let Some(reason) = &self.stop_reason {
            println!("{}", format!("Stopped early: {}", reason).yellow());
        }
        println!();

        for verdict in &self.verdicts {
            let kind = match verdict.kind {
                VerdictKind::Pass => verdict.kind.as_str().green(),
                VerdictKind::Skipped => verdict.kind.as_str().dimmed(),
                VerdictKind::Warn => verdict.kind.as_str().yellow(),
                VerdictKind::Fail => verdict.kind.as_str().red(),
                VerdictKind::Error => verdict.kind.as_str().red().bold(),
            };
            println!("  {:<7} {} {}", kind, verdict.operation, verdict.scenario);
            if verdict.kind != VerdictKind::Pass {
                println!("          {}", verdict.diagnostic.dimmed());
            }
        }
        println!();

        let summary = &self.summary;
        println!("{}", "Summary:".yellow());
        println!("  Total: {}", summary.total);
        println!("  Passed: {}", summary.passed.to_string().green());
        println!("  Warnings: {}", summary.warnings.to_string().yellow());
        println!("  Skipped: {}", summary.skipped);
        println!("  Failed: {}", summary.failed.to_string().red());
        println!("  Errors: {}", summary.errors.to_string().red());
        println!();

        if self.has_failures() {
            println!(
                "{}",
                format!("{} unit(s) did not behave as documented", summary.failed + summary.errors)
                    .red()
                    .bold()
            );
        } else {
            println!("{}", "No contract violations found ✓".green());
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Report::new(self).to_json()
    }

    pub fn print_json(&self) -> Result<()> {
        println!("{}", self.to_json()?);
        Ok(())
    }
}

/// Fuzzing engine for one contract against one service
pub struct FuzzEngine {
    contract: Contract,
    transport: Arc<dyn HttpTransport>,
    config: FuzzConfig,
    target: String,
    cancel: CancellationToken,
    show_progress: bool,
}

impl FuzzEngine {
    pub fn new(contract: Contract, transport: Arc<dyn HttpTransport>, config: FuzzConfig) -> Self {
        Self {
            contract,
            transport,
            config,
            target: String::new(),
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Plan every unit and run them
    pub async fn run(&self) -> Result<FuzzResults, FuzzerError> {
        self.config.validate()?;
        let units = iterator::plan_units(&self.contract, &self.config)?;

        let executor = Executor::new(
            Arc::clone(&self.transport),
            Arc::new(self.contract.context.clone()),
        )
        .with_timeout(self.config.request_timeout())
        .with_max_path_depth(self.config.max_path_depth)
        .with_extra_headers(self.config.extra_headers.clone());

        let session = FuzzSession::new(executor, self.config.clone())
            .with_target(self.target.clone())
            .with_cancellation(self.cancel.clone())
            .with_progress(self.show_progress);

        Ok(session.run(units).await)
    }
}

//! Fuzz Session - Runs planned units through a bounded worker pool
//!
//! Units are executed by at most `workers` concurrent executors and their
//! verdicts are reported in unit order. Cancellation and resource limits are
//! checked between units: once either trips, no new unit is scheduled, but
//! every unit already in flight runs to its verdict.

use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::reporter::{verdict_channel, VerdictProducer};

use super::config::FuzzConfig;
use super::executor::{Executor, UnitOutcome};
use super::limits::{FuzzStats, ResourceMonitor, StopReason};
use super::unit::FuzzingUnit;
use super::FuzzResults;

/// A fuzzing session over a fixed list of units
pub struct FuzzSession {
    executor: Executor,
    /// Session configuration
    config: FuzzConfig,
    /// Label of the service under test
    target: String,
    cancel: CancellationToken,
    show_progress: bool,
}

impl FuzzSession {
    /// Create a new fuzzing session
    pub fn new(executor: Executor, config: FuzzConfig) -> Self {
        Self {
            executor,
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

    /// Share a cancellation token, e.g. one tripped by Ctrl-C
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Token that cancels this session when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every unit and collect the verdicts
    pub async fn run(&self, units: Vec<FuzzingUnit>) -> FuzzResults {
        let start = Instant::now();
        let (producer, stream) = verdict_channel();

        let stop_reason = self.run_with_reporter(units, &producer).await;
        drop(producer);
        let (verdicts, summary) = stream.collect().await;

        let results = FuzzResults {
            target: self.target.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
            summary,
            stop_reason,
            verdicts,
        };

        info!(
            "Run finished: {} verdicts ({} passed, {} warnings, {} skipped, {} failed, {} errors)",
            results.summary.total,
            results.summary.passed,
            results.summary.warnings,
            results.summary.skipped,
            results.summary.failed,
            results.summary.errors
        );
        results
    }

    /// Run every unit, handing each verdict to `reporter` in unit order
    ///
    /// Returns why the run stopped early, if it did.
    pub async fn run_with_reporter(
        &self,
        units: Vec<FuzzingUnit>,
        reporter: &VerdictProducer,
    ) -> Option<StopReason> {
        let workers = self.config.workers.max(1);
        let monitor = ResourceMonitor::new(self.config.resource_limits.clone());
        let requests = AtomicU64::new(0);
        let stopped: OnceLock<StopReason> = OnceLock::new();
        let progress = self.create_progress_bar(units.len() as u64);

        info!(
            "Running {} units against {} with {} worker(s)",
            units.len(),
            if self.target.is_empty() { "target" } else { self.target.as_str() },
            workers
        );

        let requests = &requests;
        let outcomes = stream::iter(units.iter())
            .take_while(|_| {
                let proceed = self.may_schedule(&monitor, requests, &stopped);
                futures::future::ready(proceed)
            })
            .map(|unit| async move {
                let outcome = self.executor.execute(unit).await;
                let sent = outcome.verdict().map_or(0, |v| v.attempts.len() as u64);
                requests.fetch_add(sent, Ordering::SeqCst);
                outcome
            })
            .buffered(workers);
        let mut outcomes = pin!(outcomes);

        while let Some(outcome) = outcomes.next().await {
            progress.inc(1);
            match outcome {
                UnitOutcome::Reported(verdict) => {
                    progress.set_message(format!("{} {}", verdict.kind, verdict.scenario));
                    reporter.report(verdict);
                }
                UnitOutcome::Ineligible(reason) => {
                    debug!("Unit not reported: {}", reason);
                }
            }
        }

        match stopped.get() {
            Some(reason) => {
                progress.abandon_with_message(format!("stopped: {}", reason));
                Some(reason.clone())
            }
            None => {
                progress.finish_with_message("done");
                None
            }
        }
    }

    /// Whether another unit may start; records the first stop reason
    fn may_schedule(
        &self,
        monitor: &ResourceMonitor,
        requests: &AtomicU64,
        stopped: &OnceLock<StopReason>,
    ) -> bool {
        if stopped.get().is_some() {
            return false;
        }

        let reason = if self.cancel.is_cancelled() {
            Some(StopReason::Cancelled)
        } else {
            let stats = FuzzStats {
                requests: requests.load(Ordering::SeqCst),
            };
            monitor.check(&stats).map(StopReason::from)
        };

        match reason {
            Some(reason) => {
                info!("No new units scheduled: {}", reason);
                let _ = stopped.set(reason);
                false
            }
            None => true,
        }
    }

    /// Create progress bar
    fn create_progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("starting...");
        pb
    }
}

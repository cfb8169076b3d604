//! Reporter - Verdict delivery and output formatting
//!
//! The executor side holds a [`VerdictProducer`] and never waits on the
//! consumer: the channel is unbounded, so reporting is fire-and-forget.
//! The consumer side drains a [`VerdictStream`], which keeps a running
//! [`VerdictSummary`] as verdicts arrive.

pub mod junit;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::fuzzer::verdict::{Verdict, VerdictSummary};

/// Generic report wrapper
#[derive(Debug, Clone, Serialize)]
pub struct Report<T: Serialize> {
    pub tool: String,
    pub version: String,
    pub timestamp: String,
    pub data: T,
}

impl<T: Serialize> Report<T> {
    pub fn new(data: T) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Sending half of the verdict channel
#[derive(Debug, Clone)]
pub struct VerdictProducer {
    tx: mpsc::UnboundedSender<Verdict>,
}

impl VerdictProducer {
    /// Hand a verdict to the consumer without waiting
    pub fn report(&self, verdict: Verdict) {
        if let Err(err) = self.tx.send(verdict) {
            debug!("Verdict {} dropped: consumer is gone", err.0.unit_id);
        }
    }
}

/// Receiving half of the verdict channel
#[derive(Debug)]
pub struct VerdictStream {
    rx: mpsc::UnboundedReceiver<Verdict>,
    summary: VerdictSummary,
}

impl VerdictStream {
    /// Next verdict, or `None` once every producer is dropped
    pub async fn next(&mut self) -> Option<Verdict> {
        let verdict = self.rx.recv().await?;
        self.summary.record(&verdict);
        Some(verdict)
    }

    /// Counts of the verdicts received so far
    pub fn summary(&self) -> &VerdictSummary {
        &self.summary
    }

    /// Drain until every producer is dropped
    pub async fn collect(mut self) -> (Vec<Verdict>, VerdictSummary) {
        let mut verdicts = Vec::new();
        while let Some(verdict) = self.next().await {
            verdicts.push(verdict);
        }
        (verdicts, self.summary)
    }
}

/// Create a connected producer/stream pair
pub fn verdict_channel() -> (VerdictProducer, VerdictStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        VerdictProducer { tx },
        VerdictStream {
            rx,
            summary: VerdictSummary::default(),
        },
    )
}

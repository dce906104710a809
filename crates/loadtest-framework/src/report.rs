//! Stress run report types.

use crate::error::LoadTestError;
use crate::metrics::RunMetrics;
use chrono::{DateTime, Utc};
use loadtest_sink::SinkStats;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of a stress run.
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    /// Run configuration summary.
    pub config_summary: ConfigSummary,
    /// Producer-side counters, merged across producers.
    pub metrics: RunMetrics,
    /// Worker-side counters from the sink.
    pub sink: SinkStats,
    /// Overall run status.
    pub status: TestStatus,
    /// Error messages (if any).
    pub errors: Vec<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: Option<DateTime<Utc>>,
}

impl StressReport {
    /// Create a new report.
    pub fn new(config_summary: ConfigSummary) -> Self {
        Self {
            config_summary,
            metrics: RunMetrics::default(),
            sink: SinkStats::default(),
            status: TestStatus::Pending,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record the final counters and derive the status: passed when no unit
    /// failed and the sink dropped no row.
    pub fn finish(&mut self, metrics: RunMetrics, sink: SinkStats) {
        self.metrics = metrics;
        self.sink = sink;
        self.finished_at = Some(Utc::now());

        if self.metrics.units_failed > 0 {
            self.errors.push(format!(
                "{} flush unit(s) failed after exhausting retries",
                self.metrics.units_failed
            ));
        }
        if self.sink.rows_dropped > 0 {
            self.errors.push(format!(
                "{} row(s) dropped by the sink worker",
                self.sink.rows_dropped
            ));
        }

        self.status = if self.errors.is_empty() {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
    }

    /// Check if the run passed.
    pub fn passed(&self) -> bool {
        matches!(self.status, TestStatus::Passed)
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, LoadTestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generate a summary string.
    pub fn summary(&self) -> String {
        let status_str = match self.status {
            TestStatus::Pending => "PENDING",
            TestStatus::Running => "RUNNING",
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
        };

        let ratios = self
            .config_summary
            .ratios
            .iter()
            .map(|(kind, weight)| format!("{kind}={weight}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut summary = format!(
            "Stress Report: {}\n\
             =============\n\
             Command: {}\n\
             Seed: {}\n\
             Total Rows: {}\n\
             Producers: {}\n\
             Batch Size: {}\n\
             Sink: {}\n\
             Ratios: {}\n\
             Clustering: {}\n\
             Backoff: {}\n\n",
            status_str,
            self.config_summary.command,
            self.config_summary.seed,
            self.config_summary.total,
            self.config_summary.producers,
            self.config_summary.batch_size,
            self.config_summary.sink,
            ratios,
            self.config_summary.clustering,
            self.config_summary.backoff,
        );

        summary.push_str(&format!(
            "Results:\n\
             - Units Succeeded: {}\n\
             - Units Failed: {}\n\
             - Rows Written: {}\n\
             - Partitions Written: {}\n\
             - Retries: {}\n\
             - Rows Persisted: {}\n\
             - Rows Dropped: {}\n\n",
            self.metrics.units_succeeded,
            self.metrics.units_failed,
            self.metrics.rows_written,
            self.metrics.partitions_written,
            self.metrics.retries,
            self.sink.rows_persisted,
            self.sink.rows_dropped,
        ));

        if !self.metrics.ops.is_empty() {
            summary.push_str("Operations:\n");
            for (kind, count) in &self.metrics.ops {
                summary.push_str(&format!("- {kind}: {count}\n"));
            }
            summary.push('\n');
        }

        summary.push_str(&format!(
            "Timing:\n\
             - Total Duration: {:?}\n\
             - Throughput: {:.2} rows/sec\n",
            self.metrics.elapsed,
            self.metrics.rows_per_second(),
        ));

        if !self.errors.is_empty() {
            summary.push_str("\nErrors:\n");
            for error in &self.errors {
                summary.push_str(&format!("- {error}\n"));
            }
        }

        summary
    }
}

/// Summary of run configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    /// `mixed` or `write`.
    pub command: String,
    /// Random seed.
    pub seed: u64,
    /// Total rows across producers.
    pub total: u64,
    pub producers: usize,
    pub batch_size: usize,
    /// `async` or `direct`.
    pub sink: String,
    /// Weights of the kinds that can be sampled.
    pub ratios: BTreeMap<String, f64>,
    pub clustering: String,
    /// Backoff strategy and base, e.g. `exponential(1s)`.
    pub backoff: String,
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Run has not started.
    Pending,
    /// Run is in progress.
    Running,
    /// Every unit was written and nothing was dropped.
    Passed,
    /// Some units failed or rows were dropped.
    Failed,
}

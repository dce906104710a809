//! Metrics collection for stress runs.

use crate::ratio::OperationKind;
use crate::runner::WriteAttemptReport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters owned by one producer, merged into a run total at the end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// Flush units written successfully.
    pub units_succeeded: u64,
    /// Flush units that exhausted their retries.
    pub units_failed: u64,
    /// Rows credited by successful units.
    pub rows_written: u64,
    /// Partitions credited by successful units.
    pub partitions_written: u64,
    /// Retries across all units.
    pub retries: u64,
    /// Rows generated per operation kind.
    pub ops: BTreeMap<OperationKind, u64>,
    /// Wall time spent in writes, including backoff waits.
    pub write_time: Duration,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl RunMetrics {
    /// Account for one unit's outcome.
    pub fn record(&mut self, report: &WriteAttemptReport) {
        if report.success {
            self.units_succeeded += 1;
            self.rows_written += report.rows;
            self.partitions_written += report.partitions;
        } else {
            self.units_failed += 1;
        }
        self.retries += u64::from(report.retries());
        self.write_time += report.elapsed;
    }

    /// Count one generated row of `kind`.
    pub fn record_op(&mut self, kind: &OperationKind) {
        *self.ops.entry(kind.clone()).or_default() += 1;
    }

    /// Fold another producer's counters into this one. Elapsed is the
    /// longer of the two since producers run concurrently.
    pub fn merge(&mut self, other: &RunMetrics) {
        self.units_succeeded += other.units_succeeded;
        self.units_failed += other.units_failed;
        self.rows_written += other.rows_written;
        self.partitions_written += other.partitions_written;
        self.retries += other.retries;
        for (kind, count) in &other.ops {
            *self.ops.entry(kind.clone()).or_default() += count;
        }
        self.write_time += other.write_time;
        self.elapsed = self.elapsed.max(other.elapsed);
    }

    pub fn total_ops(&self) -> u64 {
        self.ops.values().sum()
    }

    /// Calculate rows per second.
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.rows_written as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

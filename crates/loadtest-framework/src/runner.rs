//! Retryable flush-unit writes and the harness that drives them.

use crate::backoff::BackoffPolicy;
use loadtest_sink::{BatchWriter, FlushUnit};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Default number of attempts before a unit is reported as failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default time budget for all attempts of one unit.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(60);

/// A unit of work that can be attempted repeatedly.
///
/// `run` makes exactly one attempt; looping and waiting belong to the
/// caller (see `RetryHarness`).
#[async_trait::async_trait]
pub trait RetryableOp: Send {
    /// Make one attempt. Returns `true` on success.
    async fn run(&mut self) -> bool;

    fn partition_count(&self) -> u64;

    fn row_count(&self) -> u64;

    /// Error from the most recent failed attempt.
    fn last_error(&self) -> Option<&str> {
        None
    }
}

/// One flush unit written through a `BatchWriter`.
///
/// A failed attempt hands the unit back, so the next `run` retries the
/// same rows.
pub struct FlushOp<'a, B: BatchWriter + ?Sized> {
    target: &'a B,
    unit: Option<FlushUnit>,
    rows: u64,
    partitions: u64,
    last_error: Option<String>,
}

impl<'a, B: BatchWriter + ?Sized> FlushOp<'a, B> {
    pub fn new(target: &'a B, unit: FlushUnit) -> Self {
        Self {
            target,
            rows: unit.row_count(),
            partitions: unit.partition_count(),
            unit: Some(unit),
            last_error: None,
        }
    }

    /// Whether the unit has been written.
    pub fn is_done(&self) -> bool {
        self.unit.is_none()
    }
}

#[async_trait::async_trait]
impl<'a, B: BatchWriter + ?Sized> RetryableOp for FlushOp<'a, B> {
    async fn run(&mut self) -> bool {
        let Some(unit) = self.unit.take() else {
            return true;
        };

        match self.target.write_batch(unit).await {
            Ok(()) => true,
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.unit = e.into_unit();
                false
            }
        }
    }

    fn partition_count(&self) -> u64 {
        self.partitions
    }

    fn row_count(&self) -> u64 {
        self.rows
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Outcome of driving one op to success or exhaustion.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteAttemptReport {
    pub success: bool,
    /// Rows credited; zero unless `success`.
    pub rows: u64,
    /// Partitions credited; zero unless `success`.
    pub partitions: u64,
    /// Attempts made, including the first.
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_error: Option<String>,
}

impl WriteAttemptReport {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Runs ops until they succeed, waiting `BackoffPolicy::delay(n)` after the
/// n-th failure, bounded by an attempt count and a total time budget. A wait
/// is cut short so it never runs past the budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryHarness {
    backoff: BackoffPolicy,
    max_attempts: u32,
    max_duration: Duration,
}

impl RetryHarness {
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self {
            backoff,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub async fn time_with_retry<O: RetryableOp + ?Sized>(&self, op: &mut O) -> WriteAttemptReport {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            if op.run().await {
                debug!(
                    "Wrote {} rows in {} attempt(s)",
                    op.row_count(),
                    attempts
                );
                return WriteAttemptReport {
                    success: true,
                    rows: op.row_count(),
                    partitions: op.partition_count(),
                    attempts,
                    elapsed: start.elapsed(),
                    last_error: None,
                };
            }

            let last_error = op.last_error().map(str::to_string);
            if attempts >= self.max_attempts || start.elapsed() >= self.max_duration {
                warn!(
                    "Giving up on {} rows after {} attempt(s) in {:?}: {}",
                    op.row_count(),
                    attempts,
                    start.elapsed(),
                    last_error.as_deref().unwrap_or("unknown error")
                );
                return WriteAttemptReport {
                    success: false,
                    rows: 0,
                    partitions: 0,
                    attempts,
                    elapsed: start.elapsed(),
                    last_error,
                };
            }

            // Never sleep past the time budget.
            let delay = self
                .backoff
                .delay(attempts)
                .min(self.max_duration.saturating_sub(start.elapsed()));
            warn!(
                "Write attempt {}/{} failed ({}), retrying in {:?}",
                attempts,
                self.max_attempts,
                last_error.as_deref().unwrap_or("unknown error"),
                delay
            );
            sleep(delay).await;
        }
    }
}

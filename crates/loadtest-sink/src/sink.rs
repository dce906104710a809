//! Bounded-queue sink with a single background writer.
//!
//! Lifecycle: `Open` → `Draining` (first `close()` call, waits for the queue
//! to empty) → `Stopped` (worker joined, writer closed). There is no path from
//! `Open` to `Stopped` that skips draining; a drain that outlives the shutdown
//! timeout is abandoned and the worker aborted.

use crate::error::SinkError;
use crate::unit::FlushUnit;
use crate::writer::{BatchWriter, RowWriter};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, error, info, trace, warn};

/// Default number of pending units the queue holds before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 2000;

/// Default bounded wait of one worker poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default pause between drain checks during `close()`.
pub const DEFAULT_DRAIN_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Default limit on draining the queue and joining the worker in `close()`.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Sink settings.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Maximum pending units; the single backpressure knob.
    pub queue_capacity: usize,
    /// How long the worker waits on an empty queue before polling again.
    pub poll_interval: Duration,
    /// How often `close()` re-checks whether the queue has drained.
    pub drain_check_interval: Duration,
    /// Total time `close()` waits for the queue to drain and the worker to exit.
    pub shutdown_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drain_check_interval: DEFAULT_DRAIN_CHECK_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl SinkConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_drain_check_interval(mut self, interval: Duration) -> Self {
        self.drain_check_interval = interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<(), SinkError> {
        if self.queue_capacity == 0 {
            return Err(SinkError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(SinkError::InvalidConfig(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sink lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkState {
    Open,
    Draining,
    Stopped,
}

impl SinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SinkState::Open,
            1 => SinkState::Draining,
            _ => SinkState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SinkState::Open => 0,
            SinkState::Draining => 1,
            SinkState::Stopped => 2,
        }
    }
}

/// Counters reported by the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// Rows the writer accepted.
    pub rows_persisted: u64,
    /// Rows whose write failed inside the worker and were dropped.
    pub rows_dropped: u64,
    /// Units dequeued and processed by the worker.
    pub units_processed: u64,
}

/// State shared between the sink handle and its worker.
#[derive(Default)]
struct Shared {
    state: AtomicU8,
    /// Units accepted by `submit` and not yet fully processed.
    pending: AtomicU64,
    rows_persisted: AtomicU64,
    rows_dropped: AtomicU64,
    units_processed: AtomicU64,
}

impl Shared {
    fn state(&self) -> SinkState {
        SinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SinkState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn stats(&self) -> SinkStats {
        SinkStats {
            rows_persisted: self.rows_persisted.load(Ordering::Relaxed),
            rows_dropped: self.rows_dropped.load(Ordering::Relaxed),
            units_processed: self.units_processed.load(Ordering::Relaxed),
        }
    }
}

/// Asynchronous writer draining a bounded queue of flush units.
pub struct AsyncWriteSink {
    config: SinkConfig,
    sender: std::sync::Mutex<Option<mpsc::Sender<FlushUnit>>>,
    /// Worker handle; taking it is what makes `close()` run once.
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl AsyncWriteSink {
    /// Start the sink and its worker. Must be called inside a tokio runtime.
    pub fn start<W: RowWriter>(writer: W, config: SinkConfig) -> Result<Self, SinkError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let shared = Arc::new(Shared::default());
        let worker = tokio::spawn(run_worker(
            writer,
            rx,
            Arc::clone(&shared),
            config.poll_interval,
        ));

        info!(
            "Started async write sink (queue capacity {})",
            config.queue_capacity
        );

        Ok(Self {
            config,
            sender: std::sync::Mutex::new(Some(tx)),
            worker: tokio::sync::Mutex::new(Some(worker)),
            shared,
        })
    }

    /// Queue a unit for writing, waiting while the queue is full.
    ///
    /// Fails with `SinkError::Closed`, handing the unit back, once `close()`
    /// has begun.
    pub async fn submit(&self, unit: FlushUnit) -> Result<(), SinkError> {
        let sender = {
            let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            match guard.as_ref() {
                Some(sender) if self.shared.state() == SinkState::Open => sender.clone(),
                _ => return Err(SinkError::Closed(unit)),
            }
        };

        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        match sender.send(unit).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(unit)) => {
                self.shared.pending.fetch_sub(1, Ordering::AcqRel);
                Err(SinkError::Closed(unit))
            }
        }
    }

    /// Units accepted but not yet fully written.
    pub fn pending(&self) -> u64 {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SinkState {
        self.shared.state()
    }

    pub fn stats(&self) -> SinkStats {
        self.shared.stats()
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Drain the queue, stop the worker and close the writer.
    ///
    /// Safe to call more than once and from several tasks at a time: only the
    /// first caller runs the shutdown, the others wait for it and get the same
    /// final counters. Units submitted before the call are all processed
    /// before it returns, unless draining and stopping the worker take longer
    /// than `shutdown_timeout`, in which case the worker is aborted and the
    /// failure logged. The sink ends `Stopped` either way.
    pub async fn close(&self) -> SinkStats {
        let mut worker = self.worker.lock().await;
        let Some(mut handle) = worker.take() else {
            return self.stats();
        };

        self.shared.set_state(SinkState::Draining);
        info!("Draining async write sink ({} pending units)", self.pending());

        // Draining and joining share one deadline.
        let deadline = Instant::now() + self.config.shutdown_timeout;
        let drained = timeout_at(deadline, async {
            while self.pending() > 0 && !handle.is_finished() {
                sleep(self.config.drain_check_interval).await;
            }
        })
        .await;
        if drained.is_err() {
            error!(
                "Async write sink did not drain within {:?}, {} units still pending",
                self.config.shutdown_timeout,
                self.pending()
            );
        }

        // Dropping the last sender lets the worker's receive return `None`.
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Async write sink worker failed: {e}"),
            Err(_) => {
                error!(
                    "Async write sink worker did not stop within {:?}, aborting",
                    self.config.shutdown_timeout
                );
                handle.abort();
            }
        }

        self.shared.set_state(SinkState::Stopped);
        let stats = self.stats();
        info!(
            "Async write sink stopped: {} rows persisted, {} dropped, {} units",
            stats.rows_persisted, stats.rows_dropped, stats.units_processed
        );
        stats
    }
}

#[async_trait::async_trait]
impl BatchWriter for AsyncWriteSink {
    async fn write_batch(&self, unit: FlushUnit) -> Result<(), SinkError> {
        self.submit(unit).await
    }
}

async fn run_worker<W: RowWriter>(
    mut writer: W,
    mut rx: mpsc::Receiver<FlushUnit>,
    shared: Arc<Shared>,
    poll_interval: Duration,
) {
    loop {
        match timeout(poll_interval, rx.recv()).await {
            Ok(Some(unit)) => {
                write_unit(&mut writer, &unit, &shared).await;
                shared.units_processed.fetch_add(1, Ordering::Relaxed);
                shared.pending.fetch_sub(1, Ordering::AcqRel);
            }
            Ok(None) => break,
            Err(_) => trace!("Async write sink idle"),
        }
    }

    if let Err(e) = writer.close().await {
        error!("Failed to close row writer: {e}");
    }
    debug!("Async write sink worker exited");
}

/// Write every row of a unit in order; failed rows are logged and dropped.
async fn write_unit<W: RowWriter>(writer: &mut W, unit: &FlushUnit, shared: &Shared) {
    for row in unit.rows() {
        match writer.write_row(row).await {
            Ok(()) => {
                shared.rows_persisted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                shared.rows_dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Dropping row for partition {:?}: {e}",
                    row.partition_key()
                );
            }
        }
    }
}

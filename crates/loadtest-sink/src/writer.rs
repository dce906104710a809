//! Writer traits: the storage seam and the batch seam.

use crate::error::{SinkError, WriteError};
use crate::sink::SinkStats;
use crate::unit::FlushUnit;
use loadtest_generator::Row;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// The storage engine's write path, one row at a time.
///
/// A writer is owned by exactly one consumer (the sink worker or a
/// `DirectBatchWriter`), so methods take `&mut self`.
#[async_trait::async_trait]
pub trait RowWriter: Send + 'static {
    /// Persist a single row.
    async fn write_row(&mut self, row: &Row) -> Result<(), WriteError>;

    /// Flush and release the underlying handle. Called once, after the last row.
    async fn close(&mut self) -> Result<(), WriteError> {
        Ok(())
    }
}

/// Writer that accepts every row and stores nothing (dry runs).
#[derive(Debug, Default)]
pub struct DiscardRowWriter;

#[async_trait::async_trait]
impl RowWriter for DiscardRowWriter {
    async fn write_row(&mut self, _row: &Row) -> Result<(), WriteError> {
        Ok(())
    }
}

/// Target of a single flush-unit write attempt.
///
/// On failure the unit comes back inside the error so the caller can retry
/// it; see `SinkError::into_unit`.
#[async_trait::async_trait]
pub trait BatchWriter: Send + Sync {
    async fn write_batch(&self, unit: FlushUnit) -> Result<(), SinkError>;
}

/// Writes each unit straight through a `RowWriter` in the caller's task.
///
/// Unlike `AsyncWriteSink`, a failing row fails the whole attempt, so
/// write errors reach the retry path instead of being dropped. Rows written
/// before the failing one are not rolled back and are written again on retry.
pub struct DirectBatchWriter<W: RowWriter> {
    writer: Mutex<W>,
    rows_persisted: AtomicU64,
    units_processed: AtomicU64,
}

impl<W: RowWriter> DirectBatchWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            rows_persisted: AtomicU64::new(0),
            units_processed: AtomicU64::new(0),
        }
    }

    /// Counters for units written in full. Nothing is ever dropped here.
    pub fn stats(&self) -> SinkStats {
        SinkStats {
            rows_persisted: self.rows_persisted.load(Ordering::Relaxed),
            rows_dropped: 0,
            units_processed: self.units_processed.load(Ordering::Relaxed),
        }
    }

    /// Close the underlying writer and return the final counters.
    pub async fn close(&self) -> Result<SinkStats, WriteError> {
        self.writer.lock().await.close().await?;
        debug!("Direct batch writer closed");
        Ok(self.stats())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait::async_trait]
impl<W: RowWriter> BatchWriter for DirectBatchWriter<W> {
    async fn write_batch(&self, unit: FlushUnit) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().await;
        for row in unit.rows() {
            if let Err(source) = writer.write_row(row).await {
                return Err(SinkError::Write { unit, source });
            }
        }
        self.rows_persisted
            .fetch_add(unit.row_count(), Ordering::Relaxed);
        self.units_processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

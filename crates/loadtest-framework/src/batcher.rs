//! Row batching with independent flush triggers.

use crate::error::ConfigError;
use loadtest_generator::Row;
use loadtest_sink::FlushUnit;

/// Default number of rows per flush unit.
pub const DEFAULT_BATCH_SIZE: usize = 30;

/// A condition that forces the buffered rows out as a flush unit.
///
/// Triggers are checked independently after every offered row; any one
/// firing flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The buffer holds this many rows.
    BatchSize(usize),
    /// The total number of rows offered over the batcher's lifetime has
    /// reached this quota.
    Quota(u64),
}

impl FlushTrigger {
    fn fires(&self, buffered: usize, total_offered: u64) -> bool {
        match *self {
            FlushTrigger::BatchSize(max) => buffered >= max,
            FlushTrigger::Quota(max_total) => total_offered >= max_total,
        }
    }
}

/// Accumulates rows for one producer and cuts them into flush units.
///
/// The batcher only signals; it keeps accepting rows after the quota is
/// reached and never flushes a partial buffer on its own. The owner stops
/// offering rows once `quota_reached()` and drains with `take_remaining()`.
#[derive(Debug)]
pub struct RowBatcher {
    buffer: Vec<Row>,
    triggers: Vec<FlushTrigger>,
    max_batch_size: usize,
    max_total: u64,
    total_offered: u64,
}

impl RowBatcher {
    /// Create a batcher flushing every `max_batch_size` rows and once
    /// `max_total` rows have been offered in total.
    pub fn new(max_batch_size: usize, max_total: u64) -> Result<Self, ConfigError> {
        if max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            buffer: Vec::with_capacity(max_batch_size),
            triggers: vec![
                FlushTrigger::BatchSize(max_batch_size),
                FlushTrigger::Quota(max_total),
            ],
            max_batch_size,
            max_total,
            total_offered: 0,
        })
    }

    /// Add another trigger alongside the size and quota ones.
    pub fn with_trigger(mut self, trigger: FlushTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Buffer a row; returns a flush unit when any trigger fires.
    pub fn offer(&mut self, row: Row) -> Option<FlushUnit> {
        self.buffer.push(row);
        self.total_offered += 1;

        let buffered = self.buffer.len();
        let total = self.total_offered;
        if self.triggers.iter().any(|t| t.fires(buffered, total)) {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Hand out whatever is still buffered, if anything.
    pub fn take_remaining(&mut self) -> Option<FlushUnit> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.flush())
        }
    }

    pub fn quota_reached(&self) -> bool {
        self.total_offered >= self.max_total
    }

    pub fn total_offered(&self) -> u64 {
        self.total_offered
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn max_total(&self) -> u64 {
        self.max_total
    }

    fn flush(&mut self) -> FlushUnit {
        let rows = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.max_batch_size));
        FlushUnit::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadtest_generator::PartitionKey;

    fn row(i: u64) -> Row {
        Row::new(PartitionKey::from_u64(i), vec![])
    }

    fn keys(unit: &FlushUnit) -> Vec<u64> {
        unit.rows()
            .iter()
            .map(|r| u64::from_be_bytes(r.partition_key().as_bytes().try_into().unwrap()))
            .collect()
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(RowBatcher::new(0, 10).is_err());
    }

    #[test]
    fn test_flushes_on_batch_size() {
        let mut batcher = RowBatcher::new(3, 100).unwrap();

        assert!(batcher.offer(row(0)).is_none());
        assert!(batcher.offer(row(1)).is_none());
        let unit = batcher.offer(row(2)).unwrap();

        assert_eq!(keys(&unit), vec![0, 1, 2]);
        assert_eq!(batcher.buffered(), 0);
        assert!(!batcher.quota_reached());
    }

    #[test]
    fn test_flushes_partial_batch_on_quota() {
        let mut batcher = RowBatcher::new(30, 45).unwrap();
        let mut units = Vec::new();

        for i in 0..45 {
            if let Some(unit) = batcher.offer(row(i)) {
                units.push(unit);
            }
        }

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].len(), 30);
        assert_eq!(units[1].len(), 15);
        assert!(batcher.quota_reached());
        assert!(batcher.take_remaining().is_none());
    }

    #[test]
    fn test_keeps_flushing_each_row_past_quota() {
        let mut batcher = RowBatcher::new(30, 2).unwrap();
        assert!(batcher.offer(row(0)).is_none());
        assert_eq!(batcher.offer(row(1)).map(|u| u.len()), Some(2));
        assert_eq!(batcher.offer(row(2)).map(|u| u.len()), Some(1));
        assert_eq!(batcher.total_offered(), 3);
    }

    #[test]
    fn test_every_row_lands_in_exactly_one_unit_in_order() {
        let mut batcher = RowBatcher::new(7, 100).unwrap();
        let mut seen = Vec::new();

        for i in 0..100 {
            if let Some(unit) = batcher.offer(row(i)) {
                assert!(!unit.is_empty());
                assert!(unit.len() <= 7);
                seen.extend(keys(&unit));
            }
        }
        if let Some(unit) = batcher.take_remaining() {
            seen.extend(keys(&unit));
        }

        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_take_remaining_drains_partial_buffer() {
        let mut batcher = RowBatcher::new(10, 100).unwrap();
        batcher.offer(row(0));
        batcher.offer(row(1));

        let unit = batcher.take_remaining().unwrap();
        assert_eq!(keys(&unit), vec![0, 1]);
        assert!(batcher.take_remaining().is_none());
    }

    #[test]
    fn test_extra_trigger() {
        let mut batcher = RowBatcher::new(10, 100)
            .unwrap()
            .with_trigger(FlushTrigger::BatchSize(2));

        assert!(batcher.offer(row(0)).is_none());
        assert_eq!(batcher.offer(row(1)).map(|u| u.len()), Some(2));
    }
}

//! Flush units: batches of rows handed from a producer to a sink.

use loadtest_generator::Row;

/// An ordered batch of rows ready to be persisted together.
///
/// A unit has exactly one owner at a time and is never cloned; it moves
/// from the producer into the sink queue and from there into the worker.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct FlushUnit {
    rows: Vec<Row>,
}

impl FlushUnit {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows in the unit.
    pub fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    /// Partitions written by the unit. Every row is its own partition write,
    /// so repeated keys are counted once per row.
    pub fn partition_count(&self) -> u64 {
        self.rows.len() as u64
    }

    /// Total payload bytes across all rows.
    pub fn payload_size(&self) -> u64 {
        self.rows.iter().map(|r| r.payload_size() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadtest_generator::PartitionKey;

    fn row(key: u64) -> Row {
        Row::new(PartitionKey::from_u64(key), vec![vec![0; 4]])
    }

    #[test]
    fn test_counts() {
        let unit = FlushUnit::new(vec![row(1), row(2), row(1)]);

        assert_eq!(unit.row_count(), 3);
        assert_eq!(unit.partition_count(), 3);
        assert_eq!(unit.payload_size(), 3 * (8 + 4));
        assert!(!unit.is_empty());
    }

    #[test]
    fn test_into_rows_preserves_order() {
        let unit = FlushUnit::new(vec![row(3), row(1), row(2)]);
        let keys: Vec<_> = unit
            .into_rows()
            .into_iter()
            .map(|r| r.partition_key().clone())
            .collect();

        assert_eq!(
            keys,
            vec![
                PartitionKey::from_u64(3),
                PartitionKey::from_u64(1),
                PartitionKey::from_u64(2)
            ]
        );
    }
}

//! Generated row types.

use std::fmt;

/// Partition key of a generated row, stored as raw bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(Vec<u8>);

impl PartitionKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Build a key from an integer, encoded big-endian.
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartitionKey(0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// A generated row: a partition key plus ordered, opaque column values.
///
/// Rows are immutable once produced; consumers only read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    partition_key: PartitionKey,
    columns: Vec<Vec<u8>>,
}

impl Row {
    pub fn new(partition_key: PartitionKey, columns: Vec<Vec<u8>>) -> Self {
        Self {
            partition_key,
            columns,
        }
    }

    pub fn partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    pub fn columns(&self) -> &[Vec<u8>] {
        &self.columns
    }

    /// Approximate payload size in bytes (key plus all column values).
    pub fn payload_size(&self) -> usize {
        self.partition_key.as_bytes().len() + self.columns.iter().map(Vec::len).sum::<usize>()
    }
}

//! Partition generator producing deterministic rows.

use crate::row::{PartitionKey, Row};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Settings that cannot produce rows
    #[error("Invalid generator settings: {0}")]
    InvalidSettings(String),
}

/// Source of rows keyed by partition.
///
/// Producers own their generator, so implementations need not be `Sync`.
pub trait PartitionGenerator: Send {
    /// Pick the partition key for the next row.
    fn next_partition_key(&mut self) -> PartitionKey;

    /// Materialize a row for the given partition key.
    fn next_row(&mut self, partition_key: PartitionKey) -> Row;
}

/// Shape of the rows produced by `SeededPartitionGenerator`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Number of value columns per row.
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Size in bytes of each column value.
    #[serde(default = "default_column_size")]
    pub column_size: usize,
    /// Size of the partition key space.
    #[serde(default = "default_partitions")]
    pub partitions: u64,
}

fn default_columns() -> usize {
    5
}

fn default_column_size() -> usize {
    34
}

fn default_partitions() -> u64 {
    1_000_000
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            column_size: default_column_size(),
            partitions: default_partitions(),
        }
    }
}

impl GeneratorSettings {
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.partitions == 0 {
            return Err(GeneratorError::InvalidSettings(
                "partitions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Row generator backed by a seeded RNG.
///
/// Two generators built from the same settings and seed produce the
/// same sequence of keys and rows.
pub struct SeededPartitionGenerator {
    settings: GeneratorSettings,
    rng: StdRng,
    rows_generated: u64,
}

impl SeededPartitionGenerator {
    /// Create a new generator with the given settings and seed.
    pub fn new(settings: GeneratorSettings, seed: u64) -> Result<Self, GeneratorError> {
        settings.validate()?;
        Ok(Self {
            settings,
            rng: StdRng::seed_from_u64(seed),
            rows_generated: 0,
        })
    }

    /// Get the number of rows generated so far.
    pub fn rows_generated(&self) -> u64 {
        self.rows_generated
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }
}

impl PartitionGenerator for SeededPartitionGenerator {
    fn next_partition_key(&mut self) -> PartitionKey {
        PartitionKey::from_u64(self.rng.gen_range(0..self.settings.partitions))
    }

    fn next_row(&mut self, partition_key: PartitionKey) -> Row {
        let columns = (0..self.settings.columns)
            .map(|_| {
                let mut value = vec![0u8; self.settings.column_size];
                self.rng.fill_bytes(&mut value);
                value
            })
            .collect();

        self.rows_generated += 1;
        Row::new(partition_key, columns)
    }
}

//! Row generation for the stress-writer load generator.
//!
//! This crate provides the `SeededPartitionGenerator`, which produces
//! deterministic rows keyed by a partition key, and `RunLength`, the
//! distribution used to cluster consecutive operations of the same kind.
//! Both draw from a caller-supplied RNG so a fixed seed replays the same run.
//!
//! # Architecture
//!
//! ```text
//! GeneratorSettings
//!        │
//!        ▼
//! ┌──────────────────────────┐
//! │ SeededPartitionGenerator │
//! │                          │
//! │  - rng (StdRng)          │
//! │  - partitions            │
//! │  - columns × column_size │
//! └────────────┬─────────────┘
//!              │ next_partition_key() / next_row(key)
//!              ▼
//!      Row { partition_key, columns }
//! ```
//!
//! # Example
//!
//! ```rust
//! use loadtest_generator::{GeneratorSettings, PartitionGenerator, SeededPartitionGenerator};
//!
//! let mut generator = SeededPartitionGenerator::new(GeneratorSettings::default(), 42).unwrap();
//! let key = generator.next_partition_key();
//! let row = generator.next_row(key);
//! assert_eq!(row.columns().len(), GeneratorSettings::default().columns);
//! ```
//!
//! # Run-length distributions
//!
//! - `fixed(N)` - every run has length N
//! - `uniform(MIN..MAX)` - uniform run length in the inclusive range
//! - `gaussian(MIN..MAX[,STDVRNG])` - normal around the midpoint, clamped

pub mod distribution;
pub mod generator;
pub mod row;

// Re-exports for convenience
pub use distribution::{DistributionError, RunLength};
pub use generator::{GeneratorError, GeneratorSettings, PartitionGenerator, SeededPartitionGenerator};
pub use row::{PartitionKey, Row};

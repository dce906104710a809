//! Load generation pipeline for stress-writer.
//!
//! This crate wires the pieces of a stress run together:
//! 1. Pick the next operation kind from a weighted, clustered ratio table
//! 2. Generate a row and batch it per producer
//! 3. Write each batch through a retry harness into an asynchronous sink
//! 4. Aggregate per-unit results into a report
//!
//! # Example
//!
//! ```ignore
//! use loadtest_framework::{StressConfig, StressPipeline};
//! use loadtest_sink::DiscardRowWriter;
//!
//! let config = StressConfig::from_file("stress.yaml")?
//!     .with_total(10_000)
//!     .with_producers(4);
//!
//! let pipeline = StressPipeline::new(config);
//! let report = pipeline.run(DiscardRowWriter).await?;
//! println!("{}", report.summary());
//! ```

pub mod backoff;
pub mod batcher;
pub mod config;
pub mod duration;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod ratio;
pub mod report;
pub mod runner;

pub use backoff::{BackoffPolicy, BackoffStrategy};
pub use batcher::{FlushTrigger, RowBatcher};
pub use config::{BackoffConfig, Command, RetryConfig, SinkMode, StressConfig};
pub use duration::parse_duration;
pub use error::{ConfigError, LoadTestError};
pub use metrics::RunMetrics;
pub use pipeline::StressPipeline;
pub use ratio::{ClusterRun, FixedOpSelector, OpSampler, OpSelector, OperationKind, RatioTable};
pub use report::{ConfigSummary, StressReport, TestStatus};
pub use runner::{FlushOp, RetryHarness, RetryableOp, WriteAttemptReport};

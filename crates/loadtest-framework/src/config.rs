//! Configuration types for stress runs.

use crate::backoff::BackoffPolicy;
use crate::batcher::DEFAULT_BATCH_SIZE;
use crate::duration::parse_duration;
use crate::error::{ConfigError, LoadTestError};
use crate::ratio::{OperationKind, RatioTable};
use crate::report::ConfigSummary;
use crate::runner::{RetryHarness, DEFAULT_MAX_ATTEMPTS};
use loadtest_generator::{GeneratorSettings, RunLength};
use loadtest_sink::SinkConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which kind of load a run generates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Clustered weighted mix over the ratio table.
    #[default]
    Mixed,
    /// Writes only; the ratio table is ignored.
    Write,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Mixed => write!(f, "mixed"),
            Command::Write => write!(f, "write"),
        }
    }
}

/// How flush units reach the row writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkMode {
    /// Queue units to a background worker; failed rows are dropped.
    #[default]
    Async,
    /// Write in the producer's task; a failed row fails the attempt and is
    /// retried with backoff.
    Direct,
}

impl fmt::Display for SinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkMode::Async => write!(f, "async"),
            SinkMode::Direct => write!(f, "direct"),
        }
    }
}

impl FromStr for SinkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "async" => Ok(SinkMode::Async),
            "direct" => Ok(SinkMode::Direct),
            _ => Err(ConfigError::Invalid(format!(
                "unknown sink mode '{s}' (expected async or direct)"
            ))),
        }
    }
}

/// Configuration for a stress run.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub command: Command,
    /// Random seed for deterministic generation and sampling.
    pub seed: u64,
    /// Rows to generate across all producers.
    pub total: u64,
    /// Number of concurrent producer tasks.
    pub producers: usize,
    /// Rows per flush unit.
    pub batch_size: usize,
    /// Sink queue capacity in flush units (async sink only).
    pub queue_capacity: usize,
    pub sink: SinkMode,
    /// Weight per operation kind; `null` or NaN means "not requested".
    pub ratios: BTreeMap<String, Option<f64>>,
    /// Run-length distribution spec, e.g. `gaussian(1..10)`.
    pub clustering: String,
    pub backoff: BackoffConfig,
    pub retry: RetryConfig,
    #[serde(flatten)]
    pub generator: GeneratorSettings,
    /// JSONL output path; rows are discarded when unset.
    pub output: Option<PathBuf>,
}

/// Backoff strategy name and base interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub strategy: String,
    pub base: String,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            strategy: "exponential".to_string(),
            base: "1s".to_string(),
        }
    }
}

/// Retry ceiling for one flush unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub max_duration: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_duration: "60s".to_string(),
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            command: Command::default(),
            seed: 42,
            total: 1_000_000,
            producers: 4,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: loadtest_sink::sink::DEFAULT_QUEUE_CAPACITY,
            sink: SinkMode::default(),
            ratios: BTreeMap::from([
                ("read".to_string(), Some(1.0)),
                ("write".to_string(), Some(1.0)),
            ]),
            clustering: RunLength::default().to_string(),
            backoff: BackoffConfig::default(),
            retry: RetryConfig::default(),
            generator: GeneratorSettings::default(),
            output: None,
        }
    }
}

impl StressConfig {
    /// Parse a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, LoadTestError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    pub fn with_producers(mut self, producers: usize) -> Self {
        self.producers = producers;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_sink(mut self, sink: SinkMode) -> Self {
        self.sink = sink;
        self
    }

    /// Set or clear the weight of one operation kind.
    pub fn with_ratio(mut self, kind: impl AsRef<str>, weight: Option<f64>) -> Self {
        self.ratios
            .insert(OperationKind::new(kind).name().to_string(), weight);
        self
    }

    /// Replace the whole ratio table.
    pub fn with_ratios(mut self, ratios: BTreeMap<String, Option<f64>>) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn with_clustering(mut self, spec: impl Into<String>) -> Self {
        self.clustering = spec.into();
        self
    }

    pub fn with_backoff(mut self, strategy: impl Into<String>, base: impl Into<String>) -> Self {
        self.backoff = BackoffConfig {
            strategy: strategy.into(),
            base: base.into(),
        };
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, max_duration: impl Into<String>) -> Self {
        self.retry = RetryConfig {
            max_attempts,
            max_duration: max_duration.into(),
        };
        self
    }

    pub fn with_generator(mut self, generator: GeneratorSettings) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    /// Check every setting, so that a bad configuration fails before any
    /// load is generated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producers == 0 {
            return Err(ConfigError::Invalid(
                "producers must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        self.generator
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        self.backoff_policy()?;
        self.retry_harness()?;
        self.clustering()?;
        if self.command == Command::Mixed {
            self.ratio_table()?;
        }
        Ok(())
    }

    pub fn backoff_policy(&self) -> Result<BackoffPolicy, ConfigError> {
        BackoffPolicy::parse(&self.backoff.strategy, parse_duration(&self.backoff.base)?)
    }

    pub fn retry_harness(&self) -> Result<RetryHarness, ConfigError> {
        Ok(RetryHarness::new(self.backoff_policy()?)
            .with_max_attempts(self.retry.max_attempts)
            .with_max_duration(parse_duration(&self.retry.max_duration)?))
    }

    pub fn ratio_table(&self) -> Result<RatioTable, ConfigError> {
        RatioTable::new(
            self.ratios
                .iter()
                .map(|(kind, weight)| (OperationKind::new(kind), *weight)),
        )
    }

    pub fn clustering(&self) -> Result<RunLength, ConfigError> {
        Ok(self.clustering.parse()?)
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig::default().with_queue_capacity(self.queue_capacity)
    }

    /// Rows assigned to producer `index`. The last producer also takes the
    /// remainder of `total / producers`.
    pub fn producer_quota(&self, index: usize) -> u64 {
        let producers = self.producers.max(1) as u64;
        let base = self.total / producers;
        if index as u64 == producers - 1 {
            base + self.total % producers
        } else {
            base
        }
    }

    /// Seed for producer `index`'s generator and sampler.
    pub fn producer_seed(&self, index: usize) -> u64 {
        self.seed.wrapping_add(index as u64)
    }

    /// Summary for the report. Only sampleable kinds are listed.
    pub fn summary(&self) -> ConfigSummary {
        let ratios = match (self.command, self.ratio_table()) {
            (Command::Mixed, Ok(table)) => table
                .kinds()
                .iter()
                .filter_map(|k| table.weight(k).map(|w| (k.to_string(), w)))
                .collect(),
            _ => BTreeMap::from([(OperationKind::write().to_string(), 1.0)]),
        };

        ConfigSummary {
            command: self.command.to_string(),
            seed: self.seed,
            total: self.total,
            producers: self.producers,
            batch_size: self.batch_size,
            sink: self.sink.to_string(),
            ratios,
            clustering: self.clustering.clone(),
            backoff: format!("{}({})", self.backoff.strategy, self.backoff.base),
        }
    }
}

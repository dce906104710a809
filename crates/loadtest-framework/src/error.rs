//! Error types for the stress pipeline.

use loadtest_generator::{DistributionError, GeneratorError};
use thiserror::Error;

/// Invalid configuration, detected before any load is generated.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// Backoff strategy name is not constant, linear or exponential.
    #[error("Unknown backoff strategy '{0}' (expected constant, linear or exponential)")]
    UnknownBackoffStrategy(String),

    /// No operation kind has a positive weight.
    #[error("Must specify at least one operation kind with a non-zero ratio")]
    EmptyRatioTable,

    /// A weight is negative or infinite.
    #[error("Invalid ratio {weight} for operation '{kind}'")]
    InvalidWeight { kind: String, weight: f64 },

    /// Clustering distribution spec could not be parsed.
    #[error(transparent)]
    Distribution(#[from] DistributionError),

    /// Duration string could not be parsed.
    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    /// Any other out-of-range setting.
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Errors that can occur during a stress run.
#[derive(Error, Debug)]
pub enum LoadTestError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generator error.
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// Sink setup error.
    #[error("Sink error: {0}")]
    Sink(String),

    /// A producer task panicked or was cancelled.
    #[error("Producer error: {0}")]
    Producer(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON report error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<loadtest_sink::SinkError> for LoadTestError {
    fn from(err: loadtest_sink::SinkError) -> Self {
        LoadTestError::Sink(err.to_string())
    }
}

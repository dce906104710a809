//! Error types for the row sink.

use crate::unit::FlushUnit;
use thiserror::Error;

/// Errors raised while persisting a single row.
#[derive(Error, Debug)]
pub enum WriteError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The storage backend refused the row.
    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Errors returned to a producer handing a unit to a sink.
///
/// Every variant carries the unit back so the caller can retry it.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink is draining or stopped and no longer accepts units.
    #[error("Sink is closed")]
    Closed(FlushUnit),

    /// Persisting the unit failed.
    #[error("Write failed: {source}")]
    Write {
        unit: FlushUnit,
        #[source]
        source: WriteError,
    },

    /// Sink settings that cannot be honored.
    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),
}

impl SinkError {
    /// Recover the unit that could not be written, if any.
    pub fn into_unit(self) -> Option<FlushUnit> {
        match self {
            SinkError::Closed(unit) | SinkError::Write { unit, .. } => Some(unit),
            SinkError::InvalidConfig(_) => None,
        }
    }
}

//! Retry backoff policies.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the delay between retries grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Constant,
    Linear,
    Exponential,
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffStrategy::Constant => write!(f, "constant"),
            BackoffStrategy::Linear => write!(f, "linear"),
            BackoffStrategy::Exponential => write!(f, "exponential"),
        }
    }
}

impl FromStr for BackoffStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constant" => Ok(BackoffStrategy::Constant),
            "linear" => Ok(BackoffStrategy::Linear),
            "exponential" => Ok(BackoffStrategy::Exponential),
            _ => Err(ConfigError::UnknownBackoffStrategy(s.to_string())),
        }
    }
}

/// A backoff strategy with its base interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    strategy: BackoffStrategy,
    base: Duration,
}

impl BackoffPolicy {
    pub fn new(strategy: BackoffStrategy, base: Duration) -> Self {
        Self { strategy, base }
    }

    /// Build a policy from a strategy name, failing on unknown names.
    pub fn parse(name: &str, base: Duration) -> Result<Self, ConfigError> {
        Ok(Self::new(name.parse()?, base))
    }

    pub fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Delay before the retry that follows failed attempt number `attempt`
    /// (counting from 1). Saturates at `Duration::MAX`.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Constant => self.base,
            BackoffStrategy::Linear => self.base.checked_mul(attempt).unwrap_or(Duration::MAX),
            BackoffStrategy::Exponential => 2u32
                .checked_pow(attempt)
                .and_then(|factor| self.base.checked_mul(factor))
                .unwrap_or(Duration::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(500);

    #[test]
    fn test_constant_ignores_attempt() {
        let policy = BackoffPolicy::new(BackoffStrategy::Constant, BASE);
        for attempt in 1..10 {
            assert_eq!(policy.delay(attempt), BASE);
        }
    }

    #[test]
    fn test_linear_is_proportional() {
        let policy = BackoffPolicy::new(BackoffStrategy::Linear, BASE);
        assert_eq!(policy.delay(1), BASE);
        assert_eq!(policy.delay(4), BASE * 4);
        assert_eq!(policy.delay(10), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_doubles() {
        let policy = BackoffPolicy::new(BackoffStrategy::Exponential, Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(5), Duration::from_secs(32));
        for attempt in 1..10 {
            assert_eq!(policy.delay(attempt + 1), policy.delay(attempt) * 2);
        }
    }

    #[test]
    fn test_exponential_saturates() {
        let policy = BackoffPolicy::new(BackoffStrategy::Exponential, Duration::from_secs(1));
        assert_eq!(policy.delay(40), Duration::MAX);
        assert_eq!(policy.delay(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let policy = BackoffPolicy::parse("EXPONENTIAL", BASE).unwrap();
        assert_eq!(policy.strategy(), BackoffStrategy::Exponential);
        assert_eq!(policy.base(), BASE);
        assert_eq!(
            "Linear".parse::<BackoffStrategy>().unwrap(),
            BackoffStrategy::Linear
        );
    }

    #[test]
    fn test_parse_unknown_strategy() {
        assert_eq!(
            BackoffPolicy::parse("fibonacci", BASE),
            Err(ConfigError::UnknownBackoffStrategy("fibonacci".to_string()))
        );
    }
}

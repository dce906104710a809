//! Duration parsing utilities.

use crate::error::ConfigError;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "250ms" or "300".
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Milliseconds suffix: "250ms"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    if s.is_empty() {
        return Err(invalid());
    }

    let parse = |num: &str| num.trim().parse::<u64>().map_err(|_| invalid());

    // "ms" must be checked before "m" and "s"
    if let Some(num) = s.strip_suffix("ms") {
        return Ok(Duration::from_millis(parse(num)?));
    }
    if let Some(num) = s.strip_suffix('h') {
        return Ok(Duration::from_secs(parse(num)?.saturating_mul(3600)));
    }
    if let Some(num) = s.strip_suffix('m') {
        return Ok(Duration::from_secs(parse(num)?.saturating_mul(60)));
    }
    if let Some(num) = s.strip_suffix('s') {
        return Ok(Duration::from_secs(parse(num)?));
    }

    // No suffix - treat as seconds
    Ok(Duration::from_secs(parse(s)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("300").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("300s").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration(" 2s ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_invalid() {
        for s in ["", "abc", "-1s", "1.5s", "ms", "10d"] {
            assert!(
                matches!(parse_duration(s), Err(ConfigError::InvalidDuration(_))),
                "accepted '{s}'"
            );
        }
    }
}

//! Run-length distributions used to cluster operations of the same kind.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::fmt;
use std::str::FromStr;

/// Default number of standard deviations between the mean and either bound
/// of a gaussian run length.
pub const DEFAULT_STDVRNG: f64 = 3.0;

/// Error type for distribution specs.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DistributionError {
    #[error("Invalid distribution spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },
}

/// Distribution over run lengths. Every variant yields values `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunLength {
    /// Every run has the same length.
    Fixed(u64),
    /// Uniform over `min..=max`.
    Uniform { min: u64, max: u64 },
    /// Normal around the midpoint of `min..=max`, rounded and clamped.
    Gaussian {
        min: u64,
        max: u64,
        mean: f64,
        stdev: f64,
        /// Standard deviations between the mean and each bound.
        stdvrng: f64,
    },
}

impl RunLength {
    /// Gaussian run length with `stdvrng` standard deviations between the
    /// mean and each bound.
    pub fn gaussian(min: u64, max: u64, stdvrng: f64) -> Self {
        let mean = (min as f64 + max as f64) / 2.0;
        let stdev = (mean - min as f64) / stdvrng;
        RunLength::Gaussian {
            min,
            max,
            mean,
            stdev,
            stdvrng,
        }
    }

    /// Smallest run length this distribution can produce.
    pub fn min(&self) -> u64 {
        match self {
            RunLength::Fixed(n) => *n,
            RunLength::Uniform { min, .. } | RunLength::Gaussian { min, .. } => *min,
        }
    }

    /// Largest run length this distribution can produce.
    pub fn max(&self) -> u64 {
        match self {
            RunLength::Fixed(n) => *n,
            RunLength::Uniform { max, .. } | RunLength::Gaussian { max, .. } => *max,
        }
    }

    /// Draw the next run length.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            RunLength::Fixed(n) => n,
            RunLength::Uniform { min, max } => rng.gen_range(min..=max),
            RunLength::Gaussian {
                min,
                max,
                mean,
                stdev,
                ..
            } => {
                if stdev <= 0.0 {
                    return min;
                }
                match Normal::new(mean, stdev) {
                    Ok(normal) => normal.sample(rng).round().clamp(min as f64, max as f64) as u64,
                    Err(_) => min,
                }
            }
        }
    }
}

impl Default for RunLength {
    fn default() -> Self {
        RunLength::gaussian(1, 10, DEFAULT_STDVRNG)
    }
}

impl fmt::Display for RunLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunLength::Fixed(n) => write!(f, "fixed({n})"),
            RunLength::Uniform { min, max } => write!(f, "uniform({min}..{max})"),
            RunLength::Gaussian {
                min, max, stdvrng, ..
            } if *stdvrng != DEFAULT_STDVRNG => write!(f, "gaussian({min}..{max},{stdvrng})"),
            RunLength::Gaussian { min, max, .. } => write!(f, "gaussian({min}..{max})"),
        }
    }
}

impl FromStr for RunLength {
    type Err = DistributionError;

    /// Parse `fixed(N)`, `uniform(MIN..MAX)`, `gaussian(MIN..MAX)` or
    /// `gaussian(MIN..MAX,STDVRNG)`. A bare integer is a fixed length.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let invalid = |reason: &str| DistributionError::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        if let Ok(n) = spec.parse::<u64>() {
            return check_min(RunLength::Fixed(n)).map_err(|r| invalid(&r));
        }

        let open = spec.find('(').ok_or_else(|| invalid("expected NAME(ARGS)"))?;
        let args = spec[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing closing parenthesis"))?;
        let name = spec[..open].trim().to_lowercase();

        let parsed = match name.as_str() {
            "fixed" => RunLength::Fixed(parse_u64(args).map_err(|r| invalid(&r))?),
            "uniform" => {
                let (min, max) = parse_range(args).map_err(|r| invalid(&r))?;
                RunLength::Uniform { min, max }
            }
            "gaussian" | "normal" | "gauss" => {
                let (range, stdvrng) = match args.split_once(',') {
                    Some((range, stdvrng)) => {
                        let stdvrng: f64 = stdvrng
                            .trim()
                            .parse()
                            .map_err(|_| invalid("STDVRNG must be a number"))?;
                        if !(stdvrng > 0.0 && stdvrng.is_finite()) {
                            return Err(invalid("STDVRNG must be positive"));
                        }
                        (range, stdvrng)
                    }
                    None => (args, DEFAULT_STDVRNG),
                };
                let (min, max) = parse_range(range).map_err(|r| invalid(&r))?;
                RunLength::gaussian(min, max, stdvrng)
            }
            other => return Err(invalid(&format!("unknown distribution '{other}'"))),
        };

        check_min(parsed).map_err(|r| invalid(&r))
    }
}

fn check_min(run_length: RunLength) -> Result<RunLength, String> {
    if run_length.min() == 0 {
        return Err("run length must be at least 1".to_string());
    }
    Ok(run_length)
}

fn parse_u64(s: &str) -> Result<u64, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("'{}' is not a non-negative integer", s.trim()))
}

fn parse_range(s: &str) -> Result<(u64, u64), String> {
    let (min, max) = s
        .split_once("..")
        .ok_or_else(|| "expected MIN..MAX".to_string())?;
    let min = parse_u64(min)?;
    let max = parse_u64(max)?;
    if min > max {
        return Err(format!("MIN {min} is greater than MAX {max}"));
    }
    Ok((min, max))
}

//! Command-line overrides for a stress run.

use clap::Args;
use loadtest_framework::{SinkMode, StressConfig};
use std::path::PathBuf;

/// Arguments shared by every stress command.
///
/// Each override is optional; unset flags keep the value from the config
/// file (or the built-in default when no file is given).
#[derive(Args, Clone, Debug, Default)]
pub struct StressArgs {
    /// Path to a stress config YAML file
    #[arg(long, short = 'c', env = "STRESS_WRITER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Total number of rows to generate across all producers
    #[arg(long)]
    pub total: Option<u64>,

    /// Number of concurrent producers
    #[arg(long)]
    pub producers: Option<usize>,

    /// Rows per flush unit
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Sink queue capacity in flush units
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// How units reach the writer: async (queued, failed rows dropped) or
    /// direct (written inline, failed rows retried)
    #[arg(long)]
    pub sink: Option<SinkMode>,

    /// Random seed for deterministic generation (same seed = same data)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Operation weight as KIND=WEIGHT (repeatable; WEIGHT "none" removes the kind)
    #[arg(long = "ratio", value_parser = parse_ratio)]
    pub ratios: Vec<(String, Option<f64>)>,

    /// Run-length distribution, e.g. fixed(4), uniform(1..10), gaussian(1..10)
    #[arg(long)]
    pub clustering: Option<String>,

    /// Retry backoff strategy: constant, linear or exponential
    #[arg(long)]
    pub backoff: Option<String>,

    /// Base backoff interval, e.g. 250ms, 1s
    #[arg(long)]
    pub backoff_base: Option<String>,

    /// Write rows as JSONL to this file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Dry-run mode: generate and batch rows but discard them
    #[arg(long)]
    pub dry_run: bool,
}

impl StressArgs {
    /// Apply every flag that was given on top of `config`.
    pub fn apply(&self, mut config: StressConfig) -> StressConfig {
        if let Some(total) = self.total {
            config.total = total;
        }
        if let Some(producers) = self.producers {
            config.producers = producers;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(sink) = self.sink {
            config.sink = sink;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        for (kind, weight) in &self.ratios {
            config = config.with_ratio(kind, *weight);
        }
        if let Some(clustering) = &self.clustering {
            config.clustering = clustering.clone();
        }
        if let Some(strategy) = &self.backoff {
            config.backoff.strategy = strategy.clone();
        }
        if let Some(base) = &self.backoff_base {
            config.backoff.base = base.clone();
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if self.dry_run {
            config.output = None;
        }
        config
    }
}

/// Parse `KIND=WEIGHT`. A weight of `none` marks the kind as not requested.
pub fn parse_ratio(s: &str) -> Result<(String, Option<f64>), String> {
    let (kind, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KIND=WEIGHT, got '{s}'"))?;

    let kind = kind.trim();
    if kind.is_empty() {
        return Err(format!("missing operation kind in '{s}'"));
    }

    let weight = weight.trim();
    if weight.eq_ignore_ascii_case("none") {
        return Ok((kind.to_string(), None));
    }
    let weight: f64 = weight
        .parse()
        .map_err(|_| format!("invalid weight '{weight}' for '{kind}'"))?;
    Ok((kind.to_string(), Some(weight)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: StressArgs,
    }

    fn parse(argv: &[&str]) -> StressArgs {
        TestCli::try_parse_from(std::iter::once("stress").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("read=3"), Ok(("read".to_string(), Some(3.0))));
        assert_eq!(parse_ratio(" write = 0.5 "), Ok(("write".to_string(), Some(0.5))));
        assert_eq!(parse_ratio("scan=none"), Ok(("scan".to_string(), None)));
        assert!(parse_ratio("read").is_err());
        assert!(parse_ratio("=1").is_err());
        assert!(parse_ratio("read=lots").is_err());
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = parse(&[]);
        let config = args.apply(StressConfig::default().with_total(77));

        assert_eq!(config.total, 77);
        assert_eq!(config.producers, 4);
        assert_eq!(config.ratios, StressConfig::default().ratios);
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&[
            "--total",
            "500",
            "--producers",
            "2",
            "--batch-size",
            "10",
            "--queue-capacity",
            "8",
            "--sink",
            "direct",
            "--seed",
            "9",
            "--ratio",
            "read=3",
            "--ratio",
            "write=none",
            "--clustering",
            "fixed(2)",
            "--backoff",
            "linear",
            "--backoff-base",
            "100ms",
            "--output",
            "/tmp/rows.jsonl",
        ]);
        let config = args.apply(StressConfig::default());

        assert_eq!(config.total, 500);
        assert_eq!(config.producers, 2);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.sink, SinkMode::Direct);
        assert_eq!(config.seed, 9);
        assert_eq!(config.ratios["read"], Some(3.0));
        assert_eq!(config.ratios["write"], None);
        assert_eq!(config.clustering, "fixed(2)");
        assert_eq!(config.backoff.strategy, "linear");
        assert_eq!(config.backoff.base, "100ms");
        assert_eq!(config.output, Some(PathBuf::from("/tmp/rows.jsonl")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_sink_mode_rejected() {
        let result = TestCli::try_parse_from(["stress", "--sink", "buffered"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dry_run_discards_output() {
        let args = parse(&["--output", "/tmp/rows.jsonl", "--dry-run"]);
        let config = args.apply(StressConfig::default());
        assert!(config.output.is_none());
    }
}

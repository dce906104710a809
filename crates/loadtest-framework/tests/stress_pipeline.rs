//! End-to-end tests for the stress pipeline.
//!
//! These tests verify that:
//! 1. Per-producer quotas and batch size decide exactly which units are written
//! 2. Rows the sink worker fails to write are dropped and fail the report
//! 3. Configuration errors abort before the writer sees a row
//! 4. JSONL output is complete and reproducible for a fixed seed
//! 5. The direct sink sends row failures back through retry with backoff

use loadtest_framework::{
    Command, ConfigError, LoadTestError, SinkMode, StressConfig, StressPipeline, TestStatus,
};
use loadtest_generator::{GeneratorSettings, Row};
use loadtest_sink::{JsonlRowWriter, RowWriter, WriteError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Counts rows, rejecting the first `reject_first` and every `reject_every`-th one.
#[derive(Clone, Default)]
struct CountingWriter {
    seen: Arc<AtomicU64>,
    reject_first: u64,
    reject_every: Option<u64>,
}

#[async_trait::async_trait]
impl RowWriter for CountingWriter {
    async fn write_row(&mut self, _row: &Row) -> Result<(), WriteError> {
        let n = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.reject_first {
            return Err(WriteError::Rejected(format!("row {n}")));
        }
        match self.reject_every {
            Some(every) if n % every == 0 => Err(WriteError::Rejected(format!("row {n}"))),
            _ => Ok(()),
        }
    }
}

fn read_write_config() -> StressConfig {
    StressConfig::default()
        .with_ratios(BTreeMap::from([
            ("read".to_string(), Some(1.0)),
            ("write".to_string(), Some(1.0)),
        ]))
        .with_batch_size(30)
        .with_total(60)
        .with_producers(2)
        .with_generator(GeneratorSettings {
            columns: 3,
            column_size: 8,
            partitions: 1_000,
        })
}

#[tokio::test]
async fn test_two_producers_write_one_full_unit_each() {
    let writer = CountingWriter::default();
    let seen = Arc::clone(&writer.seen);

    let report = StressPipeline::new(read_write_config())
        .run(writer)
        .await
        .unwrap();

    assert_eq!(report.status, TestStatus::Passed, "{}", report.summary());
    assert_eq!(report.metrics.units_succeeded, 2);
    assert_eq!(report.metrics.units_failed, 0);
    assert_eq!(report.metrics.rows_written, 60);
    assert_eq!(report.metrics.retries, 0);
    assert_eq!(report.sink.units_processed, 2);
    assert_eq!(report.sink.rows_persisted, 60);
    assert_eq!(report.sink.rows_dropped, 0);
    assert_eq!(seen.load(Ordering::SeqCst), 60);
    assert_eq!(report.metrics.total_ops(), 60);
}

#[tokio::test]
async fn test_uneven_quota_flushes_partial_units() {
    // 70 rows over 2 producers: 35 each, so one unit of 30 and one of 5.
    let config = read_write_config().with_total(70);
    let report = StressPipeline::new(config)
        .run(CountingWriter::default())
        .await
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.metrics.units_succeeded, 4);
    assert_eq!(report.sink.rows_persisted, 70);
}

#[tokio::test]
async fn test_worker_write_failures_are_dropped_and_reported() {
    let writer = CountingWriter {
        reject_every: Some(10),
        ..Default::default()
    };

    let report = StressPipeline::new(read_write_config())
        .run(writer)
        .await
        .unwrap();

    // Units were accepted by the sink, so the producers credit them; the
    // worker drops the failing rows.
    assert_eq!(report.metrics.units_succeeded, 2);
    assert_eq!(report.sink.rows_dropped, 6);
    assert_eq!(report.sink.rows_persisted, 54);
    assert_eq!(report.status, TestStatus::Failed);
    assert!(!report.errors.is_empty());
}

#[tokio::test]
async fn test_repeated_keys_count_as_separate_partitions() {
    let config = read_write_config().with_generator(GeneratorSettings {
        columns: 1,
        column_size: 4,
        partitions: 3,
    });
    let report = StressPipeline::new(config)
        .run(CountingWriter::default())
        .await
        .unwrap();

    assert_eq!(report.metrics.rows_written, 60);
    assert_eq!(report.metrics.partitions_written, 60);
}

#[tokio::test]
async fn test_direct_sink_retries_rejected_rows() {
    let writer = CountingWriter {
        reject_first: 1,
        ..Default::default()
    };
    let seen = Arc::clone(&writer.seen);
    let config = read_write_config()
        .with_sink(SinkMode::Direct)
        .with_backoff("constant", "1ms");

    let report = StressPipeline::new(config).run(writer).await.unwrap();

    assert_eq!(report.status, TestStatus::Passed, "{}", report.summary());
    assert_eq!(report.config_summary.sink, "direct");
    assert_eq!(report.metrics.retries, 1);
    assert_eq!(report.metrics.units_succeeded, 2);
    assert_eq!(report.metrics.rows_written, 60);
    assert_eq!(report.sink.rows_persisted, 60);
    assert_eq!(report.sink.units_processed, 2);
    assert_eq!(report.sink.rows_dropped, 0);
    // The rejected row's unit is written again from its first row.
    assert_eq!(seen.load(Ordering::SeqCst), 61);
}

#[tokio::test]
async fn test_direct_sink_fails_unit_after_max_attempts() {
    let writer = CountingWriter {
        reject_first: u64::MAX,
        ..Default::default()
    };
    let config = read_write_config()
        .with_sink(SinkMode::Direct)
        .with_backoff("constant", "1ms")
        .with_retry(2, "10s");

    let report = StressPipeline::new(config).run(writer).await.unwrap();

    assert_eq!(report.status, TestStatus::Failed);
    assert_eq!(report.metrics.units_failed, 2);
    assert_eq!(report.metrics.rows_written, 0);
    assert_eq!(report.metrics.retries, 2);
    assert_eq!(report.sink.rows_persisted, 0);
}

#[tokio::test]
async fn test_empty_ratio_table_aborts_before_load() {
    let writer = CountingWriter::default();
    let seen = Arc::clone(&writer.seen);
    let config = read_write_config()
        .with_ratio("read", None)
        .with_ratio("write", Some(f64::NAN));

    let result = StressPipeline::new(config).run(writer).await;

    assert!(matches!(
        result,
        Err(LoadTestError::Config(ConfigError::EmptyRatioTable))
    ));
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_backoff_aborts_before_load() {
    let config = read_write_config().with_backoff("random", "1s");
    let result = StressPipeline::new(config)
        .run(CountingWriter::default())
        .await;

    assert!(matches!(
        result,
        Err(LoadTestError::Config(ConfigError::UnknownBackoffStrategy(_)))
    ));
}

async fn run_to_jsonl(dir: &TempDir, name: &str, config: StressConfig) -> String {
    let path = dir.path().join(name);
    let writer = JsonlRowWriter::create(&path).await.unwrap();
    let report = StressPipeline::new(config).run(writer).await.unwrap();
    assert!(report.passed());
    std::fs::read_to_string(&path).unwrap()
}

#[tokio::test]
async fn test_jsonl_output_has_one_line_per_row() {
    let dir = TempDir::new().unwrap();
    let content = run_to_jsonl(&dir, "rows.jsonl", read_write_config()).await;

    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 60);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value["key"].is_string());
        assert_eq!(value["columns"].as_array().unwrap().len(), 3);
    }
}

#[tokio::test]
async fn test_single_producer_output_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let config = read_write_config()
        .with_command(Command::Write)
        .with_producers(1)
        .with_total(95)
        .with_seed(1234);

    let first = run_to_jsonl(&dir, "first.jsonl", config.clone()).await;
    let second = run_to_jsonl(&dir, "second.jsonl", config.clone()).await;
    let other_seed = run_to_jsonl(&dir, "other.jsonl", config.with_seed(4321)).await;

    assert_eq!(first.lines().count(), 95);
    assert_eq!(first, second);
    assert_ne!(first, other_seed);
}

//! Stress run orchestration.

use crate::batcher::RowBatcher;
use crate::config::{Command, SinkMode, StressConfig};
use crate::error::LoadTestError;
use crate::metrics::RunMetrics;
use crate::ratio::{FixedOpSelector, OpSampler, OpSelector, OperationKind, RatioTable};
use crate::report::{StressReport, TestStatus};
use crate::runner::{FlushOp, RetryHarness};
use loadtest_generator::{GeneratorError, PartitionGenerator, RunLength, SeededPartitionGenerator};
use loadtest_sink::{AsyncWriteSink, BatchWriter, DirectBatchWriter, FlushUnit, RowWriter};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Drives producers against one sink and reports the outcome.
///
/// Every producer owns its selector, generator and batcher; the sink is the
/// only thing they share.
pub struct StressPipeline {
    config: StressConfig,
}

impl StressPipeline {
    /// Create a new stress pipeline.
    pub fn new(config: StressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Run with `SeededPartitionGenerator`s built from the configured
    /// generator settings.
    pub async fn run<W: RowWriter>(&self, writer: W) -> Result<StressReport, LoadTestError> {
        let settings = self.config.generator.clone();
        self.run_with_generator(writer, move |seed| {
            SeededPartitionGenerator::new(settings.clone(), seed)
        })
        .await
    }

    /// Run with a caller-supplied generator per producer.
    ///
    /// Configuration is fully validated and every generator is built before
    /// the sink starts, so a bad setup aborts without writing anything.
    pub async fn run_with_generator<W, G, F>(
        &self,
        writer: W,
        generator_factory: F,
    ) -> Result<StressReport, LoadTestError>
    where
        W: RowWriter,
        G: PartitionGenerator + 'static,
        F: Fn(u64) -> Result<G, GeneratorError>,
    {
        let config = &self.config;
        config.validate()?;

        let harness = config.retry_harness()?;
        let clustering = config.clustering()?;
        let table = match config.command {
            Command::Mixed => Some(Arc::new(config.ratio_table()?)),
            Command::Write => None,
        };

        let mut producers = Vec::with_capacity(config.producers);
        for index in 0..config.producers {
            let seed = config.producer_seed(index);
            producers.push(Producer {
                index,
                selector: selector(table.as_ref(), &clustering, seed),
                generator: generator_factory(seed)?,
                batcher: RowBatcher::new(config.batch_size, config.producer_quota(index))?,
                harness,
            });
        }

        let mut report = StressReport::new(config.summary());
        report.status = TestStatus::Running;

        info!(
            "Starting {} run: {} rows across {} producers (batch size {}, {} sink)",
            config.command, config.total, config.producers, config.batch_size, config.sink
        );
        if let Some(table) = &table {
            let mix = table
                .kinds()
                .iter()
                .map(|kind| format!("{} {:.1}%", kind, table.probability(kind) * 100.0))
                .collect::<Vec<_>>()
                .join(", ");
            info!("Operation mix: {}", mix);
        }

        let start_time = Instant::now();
        let ((mut metrics, join_error), sink_stats) = match config.sink {
            SinkMode::Async => {
                let sink = Arc::new(AsyncWriteSink::start(writer, config.sink_config())?);
                let produced = run_producers(producers, Arc::clone(&sink)).await;
                (produced, sink.close().await)
            }
            SinkMode::Direct => {
                let direct = Arc::new(DirectBatchWriter::new(writer));
                let produced = run_producers(producers, Arc::clone(&direct)).await;
                let stats = match direct.close().await {
                    Ok(stats) => stats,
                    Err(e) => {
                        error!("Failed to close row writer: {}", e);
                        direct.stats()
                    }
                };
                (produced, stats)
            }
        };
        metrics.elapsed = start_time.elapsed();

        if let Some(e) = join_error {
            return Err(LoadTestError::Producer(e));
        }

        report.finish(metrics, sink_stats);

        info!(
            "Run completed in {:?}: {} rows written, {} units failed, {} rows dropped",
            report.metrics.elapsed,
            report.metrics.rows_written,
            report.metrics.units_failed,
            report.sink.rows_dropped
        );

        Ok(report)
    }
}

/// Spawn every producer against `target` and merge their metrics. The first
/// producer that did not finish is returned as an error message.
async fn run_producers<G, B>(
    producers: Vec<Producer<G>>,
    target: Arc<B>,
) -> (RunMetrics, Option<String>)
where
    G: PartitionGenerator + 'static,
    B: BatchWriter + 'static,
{
    let handles: Vec<JoinHandle<RunMetrics>> = producers
        .into_iter()
        .map(|producer| tokio::spawn(producer.run(Arc::clone(&target))))
        .collect();

    let mut metrics = RunMetrics::default();
    let mut join_error = None;
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(producer_metrics) => metrics.merge(&producer_metrics),
            Err(e) => {
                error!("Producer {} did not finish: {}", index, e);
                join_error.get_or_insert(format!("producer {index}: {e}"));
            }
        }
    }
    (metrics, join_error)
}

fn selector(table: Option<&Arc<RatioTable>>, clustering: &RunLength, seed: u64) -> Box<dyn OpSelector> {
    match table {
        Some(table) => Box::new(OpSampler::new(Arc::clone(table), clustering.clone(), seed)),
        None => Box::new(FixedOpSelector::new(OperationKind::write())),
    }
}

struct Producer<G> {
    index: usize,
    selector: Box<dyn OpSelector>,
    generator: G,
    batcher: RowBatcher,
    harness: RetryHarness,
}

impl<G: PartitionGenerator> Producer<G> {
    async fn run<B: BatchWriter>(mut self, target: Arc<B>) -> RunMetrics {
        let start_time = Instant::now();
        let harness = self.harness;
        let mut metrics = RunMetrics::default();

        while !self.batcher.quota_reached() {
            let kind = self.selector.next_kind();
            metrics.record_op(&kind);

            let key = self.generator.next_partition_key();
            let row = self.generator.next_row(key);
            if let Some(unit) = self.batcher.offer(row) {
                flush(self.index, &harness, target.as_ref(), unit, &mut metrics).await;
            }
        }

        if let Some(unit) = self.batcher.take_remaining() {
            flush(self.index, &harness, target.as_ref(), unit, &mut metrics).await;
        }

        metrics.elapsed = start_time.elapsed();
        debug!(
            "Producer {} finished: {} rows offered, {} units written, {} failed",
            self.index,
            self.batcher.total_offered(),
            metrics.units_succeeded,
            metrics.units_failed
        );
        metrics
    }
}

async fn flush<B: BatchWriter + ?Sized>(
    producer: usize,
    harness: &RetryHarness,
    target: &B,
    unit: FlushUnit,
    metrics: &mut RunMetrics,
) {
    let bytes = unit.payload_size();
    let mut op = FlushOp::new(target, unit);
    let report = harness.time_with_retry(&mut op).await;
    debug!(
        "Producer {} flushed {} rows ({} bytes) in {} attempt(s)",
        producer, report.rows, bytes, report.attempts
    );
    metrics.record(&report);
}

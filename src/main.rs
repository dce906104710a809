//! Command-line interface for stress-writer
//!
//! # Usage Examples
//!
//! ## Mixed workload
//! ```bash
//! # Equal reads and writes, clustered in runs of 1..10, written to JSONL
//! stress-writer mixed \
//!   --config stress.yaml \
//!   --ratio read=1 --ratio write=1 \
//!   --clustering "gaussian(1..10)" \
//!   --output rows.jsonl
//! ```
//!
//! ## Write-only workload
//! ```bash
//! # One million rows over 8 producers, discarded after batching
//! stress-writer write --total 1000000 --producers 8 --dry-run
//! ```
//!
//! Logging is controlled by `RUST_LOG`, e.g. `RUST_LOG=info`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use loadtest_framework::{Command, StressConfig, StressPipeline, StressReport};
use loadtest_populate::StressArgs;
use loadtest_sink::{DiscardRowWriter, JsonlRowWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stress-writer")]
#[command(about = "Generate weighted, batched write load against a row sink")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a weighted mix of operation kinds
    Mixed {
        #[command(flatten)]
        args: StressArgs,

        /// Write the JSON report to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Run writes only
    Write {
        #[command(flatten)]
        args: StressArgs,

        /// Write the JSON report to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let (command, args, report_path) = match cli.command {
        Commands::Mixed { args, report } => (Command::Mixed, args, report),
        Commands::Write { args, report } => (Command::Write, args, report),
    };

    let config = load_config(&args)?.with_command(command);
    config.validate().context("Invalid stress configuration")?;

    let report = run_stress(config).await?;
    println!("{}", report.summary());

    if let Some(path) = report_path {
        let json = report.to_json().context("Failed to serialize report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {path:?}"))?;
        tracing::info!("Report written to {:?}", path);
    }

    if !report.passed() {
        anyhow::bail!("Stress run failed: {}", report.errors.join("; "));
    }
    Ok(())
}

fn load_config(args: &StressArgs) -> anyhow::Result<StressConfig> {
    let config = match &args.config {
        Some(path) => StressConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}"))?,
        None => StressConfig::default(),
    };
    Ok(args.apply(config))
}

async fn run_stress(config: StressConfig) -> anyhow::Result<StressReport> {
    let output = config.output.clone();
    let pipeline = StressPipeline::new(config);

    let report = match output {
        Some(path) => {
            tracing::info!("Writing rows to {:?}", path);
            let writer = JsonlRowWriter::create(&path)
                .await
                .with_context(|| format!("Failed to create output file {path:?}"))?;
            pipeline.run(writer).await
        }
        None => {
            tracing::info!("No output configured, rows will be discarded");
            pipeline.run(DiscardRowWriter).await
        }
    };

    report.context("Stress run aborted")
}

//! JSONL row writer.

use crate::error::WriteError;
use crate::writer::RowWriter;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use loadtest_generator::Row;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// Default buffer size for JSONL writing.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Appends one JSON object per row to a file.
///
/// Each line looks like `{"key":"<base64>","columns":["<base64>",...]}`.
pub struct JsonlRowWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    rows_written: u64,
}

impl JsonlRowWriter {
    /// Create (or truncate) the output file.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        info!("Writing rows to '{}'", path.display());
        Ok(Self {
            path,
            writer: Some(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file)),
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

fn row_to_json(row: &Row) -> serde_json::Value {
    let columns: Vec<String> = row.columns().iter().map(|c| STANDARD.encode(c)).collect();
    serde_json::json!({
        "key": STANDARD.encode(row.partition_key().as_bytes()),
        "columns": columns,
    })
}

#[async_trait::async_trait]
impl RowWriter for JsonlRowWriter {
    async fn write_row(&mut self, row: &Row) -> Result<(), WriteError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            WriteError::Rejected(format!("'{}' is already closed", self.path.display()))
        })?;

        let mut line = serde_json::to_vec(&row_to_json(row))?;
        line.push(b'\n');
        writer.write_all(&line).await?;

        self.rows_written += 1;
        if self.rows_written % 10000 == 0 {
            debug!("Written {} rows", self.rows_written);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.shutdown().await?;
            info!(
                "Closed '{}' after {} rows",
                self.path.display(),
                self.rows_written
            );
        }
        Ok(())
    }
}

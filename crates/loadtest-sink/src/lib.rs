//! Asynchronous, backpressure-bounded row sink.
//!
//! Producers hand `FlushUnit`s to an `AsyncWriteSink`, which queues them in a
//! bounded channel and persists every row through an injected `RowWriter` on a
//! single background worker. A full queue blocks the producer; that is the only
//! flow control. `close()` waits for the queue to drain before stopping the
//! worker and closing the writer.
//!
//! ```text
//!  producer ─┐                     ┌──────────────┐
//!  producer ─┼─ submit(unit) ──▶   │ bounded mpsc │ ──▶ worker ──▶ RowWriter
//!  producer ─┘   (awaits if full)  └──────────────┘
//! ```
//!
//! `BatchWriter` is the seam the retry path writes through; both
//! `AsyncWriteSink` and the synchronous `DirectBatchWriter` implement it.

mod error;
pub mod jsonl;
pub mod sink;
pub mod unit;
pub mod writer;

pub use error::{SinkError, WriteError};
pub use jsonl::JsonlRowWriter;
pub use sink::{AsyncWriteSink, SinkConfig, SinkState, SinkStats};
pub use unit::FlushUnit;
pub use writer::{BatchWriter, DirectBatchWriter, DiscardRowWriter, RowWriter};

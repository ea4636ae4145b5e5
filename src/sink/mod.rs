//! Persistence sinks for normalized records.
//!
//! A sink receives the newly accumulated delta after every crawled page,
//! plus a flag marking the first batch of a session. Sinks must tolerate
//! overlapping ids across runs — the delivery contract is at-least-once,
//! and re-runs re-ingest.

mod csv;
mod sqlite;

pub use csv::CsvSink;
pub use sqlite::SqliteSink;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Record;

/// Errors raised by sinks while persisting a batch.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
}

/// A destination for normalized records.
#[async_trait]
pub trait Sink: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Persist a batch of records.
    ///
    /// `is_first_batch` is true for a session's first flush (the CSV sink
    /// writes its header then). Must be safe to call repeatedly with
    /// overlapping ids.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch could not be persisted; the caller
    /// logs and continues.
    async fn write(&mut self, records: &[Record], is_first_batch: bool)
        -> Result<usize, SinkError>;
}

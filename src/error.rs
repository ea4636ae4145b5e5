//! Error taxonomy for the crawl pipeline.

use thiserror::Error;

use crate::sink::SinkError;

/// Errors that can occur while crawling a topic.
///
/// Propagation is deliberately shallow: a failure inside one comment page,
/// one post, or one search page is caught at that boundary, logged, and the
/// crawl continues with the next unit. Only configuration and client
/// construction failures abort a run.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Transport failure or non-success HTTP status.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// A required field was missing or malformed in an API payload.
    #[error("schema: {0}")]
    Schema(String),

    /// A sink failed to persist a batch.
    #[error("sink: {0}")]
    Sink(#[from] SinkError),

    /// A media file could not be fetched to disk.
    #[error("fetch: {0}")]
    Fetch(String),
}

//! Error types shared across the tracing pipeline.
use std::sync::PoisonError;
use thiserror::Error;

/// Describe the result of operations in the tracing pipeline.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors returned by the tracing pipeline.
///
/// Export-path failures never reach request handlers: span processors log
/// them and swallow them. These variants surface only through the explicit
/// pipeline-management calls (`force_flush`, `shutdown`) and the inspection
/// API of the in-memory exporter.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// The exporter rejected or failed to deliver a batch of spans.
    #[error("span export failed: {0}")]
    ExportFailed(String),

    /// The pipeline was already shut down when the operation was attempted.
    #[error("tracer provider is already shut down")]
    AlreadyShutdown,

    /// Other failures not covered by the variants above.
    #[error("{0}")]
    Other(String),
}

impl<T> From<PoisonError<T>> for TraceError {
    fn from(err: PoisonError<T>) -> Self {
        TraceError::Other(err.to_string())
    }
}

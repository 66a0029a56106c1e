//! HTTP service demonstrating the `tracelab` pipeline end to end: traced
//! handlers, context propagation over an outbound hop to itself, and an
//! inspection endpoint that drains the in-memory exporter.
pub mod app;
pub mod config;
pub mod error;
pub mod headers;

pub use app::{build_pipeline, handle, serve, AppState};
pub use config::{Config, ExporterKind};
pub use error::ServiceError;

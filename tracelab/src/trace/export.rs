//! Export sinks for finished spans.
use crate::error::{TraceError, TraceResult};
use crate::trace::span::SpanData;
use futures_util::future::BoxFuture;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// Result of an export attempt.
pub type ExportResult = Result<(), TraceError>;

/// A sink that receives batches of finished spans.
///
/// Exporting is non-critical by design: implementations report failures
/// through the returned result and the calling processor logs and swallows
/// them, so a broken sink never fails the request that produced the span.
pub trait SpanExporter: Send + Sync + Debug {
    /// Export a batch of finished spans.
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult>;

    /// Shut the exporter down, releasing any held resources.
    fn shutdown(&mut self) {}
}

/// An in-memory span exporter that buffers finished spans for retrieval.
///
/// Spans are appended in the order they finish. The buffer is unbounded:
/// callers are expected to [`drain`] it regularly, or inspect it without
/// consuming via [`get_finished_spans`] and [`clear`]. Every operation takes
/// the internal lock, so concurrent appends and drains neither lose nor
/// duplicate entries.
///
/// [`drain`]: InMemorySpanExporter::drain
/// [`get_finished_spans`]: InMemorySpanExporter::get_finished_spans
/// [`clear`]: InMemorySpanExporter::clear
///
/// # Example
/// ```
/// use tracelab::trace::{InMemorySpanExporter, TracerProvider};
///
/// let exporter = InMemorySpanExporter::default();
/// let provider = TracerProvider::builder()
///     .with_simple_exporter(exporter.clone())
///     .build();
///
/// let mut span = provider.tracer("example").start("work");
/// span.end();
///
/// assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
/// exporter.clear();
/// assert!(exporter.get_finished_spans().unwrap().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemorySpanExporter {
    /// Returns a copy of the buffered finished spans, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a `TraceError` if the internal lock cannot be acquired.
    pub fn get_finished_spans(&self) -> TraceResult<Vec<SpanData>> {
        self.spans
            .lock()
            .map(|spans_guard| spans_guard.clone())
            .map_err(TraceError::from)
    }

    /// Takes the buffered finished spans, leaving the buffer empty.
    ///
    /// Read and reset happen under one lock acquisition, so a span finishing
    /// concurrently lands either in the returned batch or in the buffer for
    /// the next drain, never in neither.
    ///
    /// # Errors
    ///
    /// Returns a `TraceError` if the internal lock cannot be acquired.
    pub fn drain(&self) -> TraceResult<Vec<SpanData>> {
        self.spans
            .lock()
            .map(|mut spans_guard| std::mem::take(&mut *spans_guard))
            .map_err(TraceError::from)
    }

    /// Empties the buffer of finished spans.
    pub fn clear(&self) {
        let _ = self.spans.lock().map(|mut spans_guard| spans_guard.clear());
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self
            .spans
            .lock()
            .map(|mut spans_guard| spans_guard.extend(batch))
            .map_err(|err| TraceError::ExportFailed(format!("failed to lock span buffer: {err}")));
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.clear();
    }
}

/// A span exporter that writes one human-readable line per span to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSpanExporter {
    _private: (),
}

impl ConsoleSpanExporter {
    /// Create a new console exporter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpanExporter for ConsoleSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        for span in &batch {
            let duration = span
                .end_time
                .duration_since(span.start_time)
                .unwrap_or_default();
            println!(
                "span name={} trace_id={} span_id={} parent={} kind={} status={} duration={:?}",
                span.name,
                span.span_context.trace_id(),
                span.span_context.span_id(),
                span.parent_id()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_owned()),
                span.span_kind.as_str(),
                span.status.as_str(),
                duration,
            );
        }
        Box::pin(std::future::ready(Ok(())))
    }
}

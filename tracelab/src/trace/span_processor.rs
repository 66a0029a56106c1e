//! # Span Processor Interface
//!
//! Span processors sit between span finishing and export: the provider
//! invokes every attached processor synchronously when a span starts and
//! when it ends. Processors must be registered on the [`TracerProvider`] at
//! construction; a provider without processors drops every finished span.
//!
//! ```ascii
//!   +-------+--------------+   +----------------------+   +-------------------+
//!   |       |              |   |                      |   |                   |
//!   |       |              +---> SimpleSpanProcessor  +--->   SpanExporter    |
//!   |       |              |   |                      |   |  (InMemory, ...)  |
//!   | Tracer| Span::end()  |   +----------------------+   +-------------------+
//!   +-------+--------------+
//! ```
//!
//! [`TracerProvider`]: crate::trace::TracerProvider
use crate::error::TraceResult;
use crate::trace::export::SpanExporter;
use crate::trace::span::{Span, SpanData};
use crate::Context;
use std::sync::Mutex;

/// Hooks invoked by the provider around the span lifecycle.
///
/// Both hooks are called synchronously on the thread driving the span, so
/// implementations must not block for long and must never panic: a failing
/// observability path must not fail the request that produced the span.
pub trait SpanProcessor: Send + Sync + std::fmt::Debug {
    /// Called when a span is started.
    fn on_start(&self, span: &mut Span, cx: &Context);
    /// Called exactly once per finished span, before `Span::end` returns.
    fn on_end(&self, span: SpanData);
    /// Export any spans held back by the processor.
    fn force_flush(&self) -> TraceResult<()>;
    /// Shuts down the processor and its exporter.
    fn shutdown(&self) -> TraceResult<()>;
}

/// A [`SpanProcessor`] that passes each finished span to its exporter the
/// moment the span ends, without batching.
///
/// Because the hand-off is synchronous, a finished span is visible in the
/// exporter before the call that ended it returns — which is exactly what an
/// inspection endpoint draining the buffer right after a request needs.
/// Export failures are logged and swallowed.
#[derive(Debug)]
pub struct SimpleSpanProcessor {
    exporter: Mutex<Box<dyn SpanExporter>>,
}

impl SimpleSpanProcessor {
    /// Create a new [`SimpleSpanProcessor`] using the provided exporter.
    pub fn new(exporter: Box<dyn SpanExporter>) -> Self {
        Self {
            exporter: Mutex::new(exporter),
        }
    }
}

impl SpanProcessor for SimpleSpanProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {
        // Ignored
    }

    fn on_end(&self, span: SpanData) {
        let result = self
            .exporter
            .lock()
            .map_err(crate::TraceError::from)
            .and_then(|mut exporter| futures_executor::block_on(exporter.export(vec![span])));

        if let Err(err) = result {
            tracing::debug!("simple span processor failed to export span: {err}");
        }
    }

    fn force_flush(&self) -> TraceResult<()> {
        // Nothing is held back by the simple processor.
        Ok(())
    }

    fn shutdown(&self) -> TraceResult<()> {
        let mut exporter = self.exporter.lock()?;
        exporter.shutdown();
        Ok(())
    }
}

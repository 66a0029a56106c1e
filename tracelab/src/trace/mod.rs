//! Types for tracking the progression of a single request through a set of
//! cooperating handlers. A trace is a tree of [`Span`]s sharing one
//! [`TraceId`]; each span records one timed unit of work with a link to its
//! parent.
//!
//! Spans are created through a [`Tracer`], obtained from a
//! [`TracerProvider`]. The provider also owns the export path: every
//! [`SpanProcessor`] attached at construction receives each span the moment
//! it finishes. Attaching a processor is an explicit step; a provider built
//! without one drops all spans silently, which callers can detect with
//! [`TracerProvider::has_span_processors`].
//!
//! ```
//! use tracelab::trace::{InMemorySpanExporter, TracerProvider};
//! use tracelab::{Context, TraceContextExt};
//!
//! let exporter = InMemorySpanExporter::default();
//! let provider = TracerProvider::builder()
//!     .with_simple_exporter(exporter.clone())
//!     .build();
//!
//! let tracer = provider.tracer("handlers");
//! let span = tracer.start("parent");
//! let cx = Context::current_with_span(span);
//! {
//!     // Children started under an attached context join the same trace.
//!     let _guard = cx.clone().attach();
//!     let child = tracer.start("child");
//!     drop(child); // dropping ends the span
//! }
//! cx.span().end();
//!
//! let finished = exporter.get_finished_spans().unwrap();
//! assert_eq!(finished.len(), 2);
//! assert_eq!(
//!     finished[0].span_context.trace_id(),
//!     finished[1].span_context.trace_id()
//! );
//! ```

pub(crate) mod context;
mod export;
mod id_generator;
mod provider;
mod span;
mod span_context;
mod span_processor;
mod tracer;

pub use context::{get_active_span, mark_span_as_active, SpanRef, TraceContextExt};
pub use export::{ConsoleSpanExporter, ExportResult, InMemorySpanExporter, SpanExporter};
pub use id_generator::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use provider::{TracerProvider, TracerProviderBuilder};
pub use span::{Span, SpanData, SpanKind, Status};
pub use span_context::{SpanContext, SpanId, TraceId};
pub use span_processor::{SimpleSpanProcessor, SpanProcessor};
pub use tracer::{SpanBuilder, Tracer};

//! A minimal in-process distributed tracing pipeline.
//!
//! `tracelab` provides the pieces needed to follow one logical request
//! through a set of cooperating handlers:
//!
//! * [`trace`] — spans, tracers, span processors, and export sinks. A
//!   [`trace::TracerProvider`] is the wiring point: span processors must be
//!   attached explicitly at construction or every finished span is silently
//!   dropped (a failure mode callers can detect via
//!   [`trace::TracerProvider::has_span_processors`]).
//! * [`Context`] — an execution-scoped, immutable value carrying the active
//!   span. The current context is tracked per thread and travels across
//!   `await` points with [`FutureExt::with_context`], so concurrent requests
//!   never observe each other's spans.
//! * [`propagation`] — encodes the active span's identity into a transport
//!   header (`traceparent`) and decodes it on the receiving side, letting two
//!   independently instrumented processes agree on one trace.
//!
//! # Getting started
//!
//! ```
//! use tracelab::{
//!     trace::{InMemorySpanExporter, TracerProvider},
//!     Context, TraceContextExt,
//! };
//!
//! let exporter = InMemorySpanExporter::default();
//! let provider = TracerProvider::builder()
//!     .with_simple_exporter(exporter.clone())
//!     .build();
//! let tracer = provider.tracer("example");
//!
//! let span = tracer.start("say hello");
//! let cx = Context::current_with_span(span);
//! cx.span().end();
//!
//! assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
//! ```

mod common;
mod context;
mod error;
pub mod propagation;
pub mod trace;

pub use common::{KeyValue, Value};
pub use context::{Context, ContextGuard, FutureExt, WithContext};
pub use error::{TraceError, TraceResult};
pub use trace::{get_active_span, mark_span_as_active, TraceContextExt};

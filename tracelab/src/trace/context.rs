//! Context extensions for tracing
use crate::common::KeyValue;
use crate::trace::span::{Span, Status};
use crate::trace::span_context::SpanContext;
use crate::{Context, ContextGuard};
use std::sync::Mutex;

const NOOP_SPAN: SynchronizedSpan = SynchronizedSpan {
    span_context: SpanContext::NONE,
    inner: None,
};

/// A span carried by a [`Context`].
///
/// The immutable identity lives beside the mutable span so the identity can
/// be read (and propagated) without locking.
#[derive(Debug)]
pub(crate) struct SynchronizedSpan {
    /// Immutable span context
    span_context: SpanContext,
    /// Mutable span state that requires synchronization; `None` for contexts
    /// built from a remote span context only.
    inner: Option<Mutex<Span>>,
}

impl From<SpanContext> for SynchronizedSpan {
    fn from(value: SpanContext) -> Self {
        Self {
            span_context: value,
            inner: None,
        }
    }
}

impl From<Span> for SynchronizedSpan {
    fn from(value: Span) -> Self {
        Self {
            span_context: value.span_context().clone(),
            inner: Some(Mutex::new(value)),
        }
    }
}

/// A reference to the currently active span in this context.
#[derive(Debug)]
pub struct SpanRef<'a>(&'a SynchronizedSpan);

impl SpanRef<'_> {
    fn with_inner_mut<F: FnOnce(&mut Span)>(&self, f: F) {
        if let Some(ref inner) = self.0.inner {
            match inner.lock() {
                Ok(mut locked) => f(&mut locked),
                Err(err) => tracing::warn!("active span lock poisoned: {err}"),
            }
        }
    }

    /// A reference to the [`SpanContext`] for this span.
    pub fn span_context(&self) -> &SpanContext {
        &self.0.span_context
    }

    /// Returns `true` if this span is still recording information.
    pub fn is_recording(&self) -> bool {
        self.0
            .inner
            .as_ref()
            .and_then(|inner| inner.lock().ok().map(|active| active.is_recording()))
            .unwrap_or(false)
    }

    /// Set an attribute of this span.
    pub fn set_attribute(&self, attribute: KeyValue) {
        self.with_inner_mut(move |inner| inner.set_attribute(attribute))
    }

    /// Sets the status of this span.
    pub fn set_status(&self, status: Status) {
        self.with_inner_mut(move |inner| inner.set_status(status))
    }

    /// Signals that the operation described by this span has now ended.
    pub fn end(&self) {
        self.with_inner_mut(|inner| inner.end())
    }
}

/// Methods for storing and retrieving trace data in a [`Context`].
pub trait TraceContextExt {
    /// Returns a clone of the current context with the included [`Span`].
    fn current_with_span(span: Span) -> Self;

    /// Returns a clone of this context with the included span.
    fn with_span(&self, span: Span) -> Self;

    /// Returns a reference to this context's span, or a no-op span reference
    /// if none has been set.
    fn span(&self) -> SpanRef<'_>;

    /// Returns whether or not an active span has been set.
    fn has_active_span(&self) -> bool;

    /// Returns a copy of this context with the span context included.
    ///
    /// This is useful for building propagators: the receiving side installs
    /// the extracted remote identity so the next span started under this
    /// context joins the remote trace.
    fn with_remote_span_context(&self, span_context: SpanContext) -> Self;
}

impl TraceContextExt for Context {
    fn current_with_span(span: Span) -> Self {
        Context::current_with_synchronized_span(span.into())
    }

    fn with_span(&self, span: Span) -> Self {
        self.with_synchronized_span(span.into())
    }

    fn span(&self) -> SpanRef<'_> {
        if let Some(span) = self.span.as_ref() {
            SpanRef(span)
        } else {
            SpanRef(&NOOP_SPAN)
        }
    }

    fn has_active_span(&self) -> bool {
        self.span.is_some()
    }

    fn with_remote_span_context(&self, span_context: SpanContext) -> Self {
        self.with_synchronized_span(span_context.into())
    }
}

/// Mark a given `Span` as active for the enclosing scope.
///
/// Dropping the returned guard restores the previously active span, which
/// re-activates the parent.
#[must_use = "Dropping the guard detaches the context."]
pub fn mark_span_as_active(span: Span) -> ContextGuard {
    let cx = Context::current_with_span(span);
    cx.attach()
}

/// Executes a closure with a reference to this thread's current span.
pub fn get_active_span<F, T>(f: F) -> T
where
    F: FnOnce(SpanRef<'_>) -> T,
{
    Context::map_current(|cx| f(cx.span()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{InMemorySpanExporter, TracerProvider};

    #[test]
    fn noop_span_ref_for_empty_context() {
        let cx = Context::new();
        assert!(!cx.has_active_span());
        assert_eq!(cx.span().span_context(), &SpanContext::NONE);
        assert!(!cx.span().is_recording());
        // Mutations against the no-op span are silently ignored.
        cx.span().set_status(Status::Ok);
        cx.span().end();
    }

    #[test]
    fn active_span_visible_from_nested_code() {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("test");

        let span = tracer.start("outer");
        let expected = span.span_context().clone();
        {
            let _guard = mark_span_as_active(span);
            get_active_span(|span_ref| {
                assert_eq!(span_ref.span_context(), &expected);
                span_ref.set_attribute(KeyValue::new("seen", true));
            });
        }

        // Guard dropped: context detached, span ended on drop of the context.
        let finished = exporter.get_finished_spans().unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].attributes, vec![KeyValue::new("seen", true)]);
    }
}

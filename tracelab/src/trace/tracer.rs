//! # Tracer
//!
//! The [`Tracer`] is responsible for creating [`Span`]s. A span started
//! under a context carrying an active span (local or remote) becomes a child
//! of that span and inherits its trace id; otherwise it starts a new trace.
use crate::common::KeyValue;
use crate::trace::provider::TracerProvider;
use crate::trace::span::{Span, SpanData, SpanKind, Status};
use crate::trace::span_context::{SpanContext, SpanId};
use crate::trace::TraceContextExt;
use crate::Context;
use std::borrow::Cow;
use std::time::SystemTime;

/// Creates spans on behalf of one instrumented component.
///
/// Tracers are cheap handles over their provider; clone freely.
#[derive(Clone, Debug)]
pub struct Tracer {
    name: Cow<'static, str>,
    provider: TracerProvider,
}

impl Tracer {
    pub(crate) fn new(name: Cow<'static, str>, provider: TracerProvider) -> Self {
        Tracer { name, provider }
    }

    /// Returns a span builder for the given operation name.
    pub fn span_builder(&self, name: impl Into<Cow<'static, str>>) -> SpanBuilder {
        SpanBuilder::from_name(name)
    }

    /// Starts a span with the current thread's context as parent.
    pub fn start(&self, name: impl Into<Cow<'static, str>>) -> Span {
        Context::map_current(|cx| self.start_with_context(name, cx))
    }

    /// Starts a span with the given context as parent.
    pub fn start_with_context(&self, name: impl Into<Cow<'static, str>>, cx: &Context) -> Span {
        self.build_with_context(SpanBuilder::from_name(name), cx)
    }

    /// Starts a span from a builder, resolving the parent from `cx`.
    ///
    /// If the provider has been shut down the returned span is
    /// non-recording: it carries an invalid identity and nothing it does is
    /// exported.
    pub fn build_with_context(&self, builder: SpanBuilder, cx: &Context) -> Span {
        if self.provider.is_shutdown() {
            tracing::debug!(
                tracer = %self.name,
                "span requested after provider shutdown; returning a non-recording span"
            );
            return Span::new(SpanContext::NONE, None, self.provider.clone());
        }

        let id_generator = self.provider.id_generator();
        let span_id = id_generator.new_span_id();

        // An active span in the context, local or remote, makes the new span
        // a child in the same trace. Anything else starts a fresh trace.
        let parent = cx
            .has_active_span()
            .then(|| cx.span().span_context().clone())
            .filter(SpanContext::is_valid);
        let (trace_id, parent_span_id) = match parent {
            Some(parent_cx) => (parent_cx.trace_id(), parent_cx.span_id()),
            None => (id_generator.new_trace_id(), SpanId::INVALID),
        };

        let span_context = SpanContext::new(trace_id, span_id, false);
        let SpanBuilder {
            name,
            span_kind,
            attributes,
            start_time,
        } = builder;
        let data = SpanData {
            span_context: span_context.clone(),
            parent_span_id,
            span_kind: span_kind.unwrap_or_default(),
            name,
            start_time: start_time.unwrap_or_else(SystemTime::now),
            end_time: SystemTime::UNIX_EPOCH,
            attributes: attributes.unwrap_or_default(),
            status: Status::Unset,
        };

        let mut span = Span::new(span_context, Some(data), self.provider.clone());
        for processor in self.provider.span_processors() {
            processor.on_start(&mut span, cx);
        }
        span
    }
}

/// Captures everything about a span before it starts.
///
/// Build one via [`Tracer::span_builder`], then call [`start`] or
/// [`start_with_context`] to obtain the running [`Span`].
///
/// [`start`]: SpanBuilder::start
/// [`start_with_context`]: SpanBuilder::start_with_context
#[derive(Clone, Debug, Default)]
pub struct SpanBuilder {
    /// Operation name
    pub name: Cow<'static, str>,
    /// Span kind, [`SpanKind::Internal`] if unset.
    pub span_kind: Option<SpanKind>,
    /// Attributes present from the start.
    pub attributes: Option<Vec<KeyValue>>,
    /// Explicit start time override.
    pub start_time: Option<SystemTime>,
}

impl SpanBuilder {
    /// Create a new span builder from an operation name.
    pub fn from_name(name: impl Into<Cow<'static, str>>) -> Self {
        SpanBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Assign the span kind.
    pub fn with_kind(self, span_kind: SpanKind) -> Self {
        SpanBuilder {
            span_kind: Some(span_kind),
            ..self
        }
    }

    /// Assign initial attributes.
    pub fn with_attributes<I>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        SpanBuilder {
            attributes: Some(attributes.into_iter().collect()),
            ..self
        }
    }

    /// Start the span with the current thread's context as parent.
    pub fn start(self, tracer: &Tracer) -> Span {
        Context::map_current(|cx| tracer.build_with_context(self, cx))
    }

    /// Start the span with the given context as parent.
    pub fn start_with_context(self, tracer: &Tracer, cx: &Context) -> Span {
        tracer.build_with_context(self, cx)
    }
}

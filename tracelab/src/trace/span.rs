//! # Span
//!
//! `Span`s represent a single operation within a trace. A span is created in
//! a started state, may accumulate attributes and a status while it is
//! running, and transitions to finished exactly once: at that point it is
//! handed to every processor attached to the owning provider and becomes
//! immutable.
use crate::common::KeyValue;
use crate::trace::provider::TracerProvider;
use crate::trace::span_context::{SpanContext, SpanId};
use std::borrow::Cow;
use std::time::SystemTime;

/// The kind of operation a span describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpanKind {
    /// An operation internal to one process.
    #[default]
    Internal,
    /// Handling of an inbound request.
    Server,
    /// An outbound call to another service.
    Client,
}

impl SpanKind {
    /// Lowercase wire/reporting name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
        }
    }
}

/// The status of a finished span.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Status {
    /// The default status.
    #[default]
    Unset,
    /// The operation completed successfully.
    Ok,
    /// The operation failed.
    Error {
        /// Human readable failure description.
        description: Cow<'static, str>,
    },
}

impl Status {
    /// Create an error status with the given description.
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }

    /// Lowercase wire/reporting name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unset => "unset",
            Status::Ok => "ok",
            Status::Error { .. } => "error",
        }
    }
}

/// The immutable record of a finished span, as handed to processors and
/// exporters.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Identity of the span within its trace.
    pub span_context: SpanContext,
    /// Id of the parent span, [`SpanId::INVALID`] for a trace root.
    pub parent_span_id: SpanId,
    /// Span kind
    pub span_kind: SpanKind,
    /// Operation label
    pub name: Cow<'static, str>,
    /// Span start time
    pub start_time: SystemTime,
    /// Span end time
    pub end_time: SystemTime,
    /// Span attributes
    pub attributes: Vec<KeyValue>,
    /// Span status
    pub status: Status,
}

impl SpanData {
    /// Returns the parent span id, or `None` for a trace root.
    pub fn parent_id(&self) -> Option<SpanId> {
        (self.parent_span_id != SpanId::INVALID).then_some(self.parent_span_id)
    }
}

/// Single operation within a trace.
///
/// The scope that starts a span owns ending it. [`Span::end`] is the normal
/// path; a span that goes out of scope without being ended explicitly is
/// ended by `Drop`, so every exit path (including early returns and error
/// paths) releases the span and nothing stays open.
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanData>,
    provider: TracerProvider,
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        data: Option<SpanData>,
        provider: TracerProvider,
    ) -> Self {
        Span {
            span_context,
            data,
            provider,
        }
    }

    /// Returns the `SpanContext` for the given `Span`.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Returns `true` if this span is still recording information.
    ///
    /// Spans stop recording once they have ended.
    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    /// Sets a single attribute on this span.
    ///
    /// Setting an attribute with a key already present appends rather than
    /// overwrites; readers see the latest value last.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        if let Some(data) = self.data.as_mut() {
            data.attributes.push(attribute);
        }
    }

    /// Sets the status of this span.
    pub fn set_status(&mut self, status: Status) {
        if let Some(data) = self.data.as_mut() {
            data.status = status;
        }
    }

    /// Signals that the operation described by this span has now ended.
    ///
    /// The finished span is forwarded synchronously to every processor
    /// attached to the owning provider before this call returns. Ending a
    /// span twice is a no-op: the second call returns without side effects.
    pub fn end(&mut self) {
        self.end_with_timestamp(SystemTime::now());
    }

    /// Signals that the operation described by this span ended at the given
    /// time. See [`Span::end`].
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        // Taking the data marks the span as ended; a second end finds None.
        let mut data = match self.data.take() {
            Some(data) => data,
            None => return,
        };
        data.end_time = timestamp;
        self.provider.export_span(data);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.data.is_some() {
            tracing::debug!(
                span_id = %self.span_context.span_id(),
                "span dropped without an explicit end; ending it now"
            );
            self.end_with_timestamp(SystemTime::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{InMemorySpanExporter, TracerProvider};
    use crate::KeyValue;

    fn test_pipeline() -> (TracerProvider, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (provider, exporter)
    }

    #[test]
    fn end_exports_exactly_once() {
        let (provider, exporter) = test_pipeline();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("op");
        span.set_attribute(KeyValue::new("endpoint", "test"));
        span.end();
        // Second end is a documented no-op.
        span.end();

        let finished = exporter.get_finished_spans().unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].name, "op");
        assert_eq!(finished[0].attributes, vec![KeyValue::new("endpoint", "test")]);
    }

    #[test]
    fn mutations_after_end_are_ignored() {
        let (provider, exporter) = test_pipeline();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("op");
        span.end();
        assert!(!span.is_recording());
        span.set_attribute(KeyValue::new("late", true));
        span.set_status(Status::error("too late"));

        let finished = exporter.get_finished_spans().unwrap();
        assert!(finished[0].attributes.is_empty());
        assert_eq!(finished[0].status, Status::Unset);
    }

    #[test]
    fn drop_ends_unended_span() {
        let (provider, exporter) = test_pipeline();
        let tracer = provider.tracer("test");

        {
            let mut span = tracer.start("leaky");
            span.set_status(Status::error("early exit"));
            // No explicit end; leaving the scope must still release it.
        }

        let finished = exporter.get_finished_spans().unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status, Status::error("early exit"));
    }

    #[test]
    fn status_and_kind_names() {
        assert_eq!(Status::Unset.as_str(), "unset");
        assert_eq!(Status::Ok.as_str(), "ok");
        assert_eq!(Status::error("boom").as_str(), "error");
        assert_eq!(SpanKind::Internal.as_str(), "internal");
        assert_eq!(SpanKind::Server.as_str(), "server");
        assert_eq!(SpanKind::Client.as_str(), "client");
    }
}

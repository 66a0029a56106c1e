//! Propagator that sends and receives span identity in a `traceparent`
//! header, version 00: `{version}-{trace_id}-{span_id}-{flags}`, all fields
//! lowercase hex.
use crate::propagation::{Extractor, Injector, TextMapPropagator};
use crate::trace::{SpanContext, SpanId, TraceContextExt, TraceId};
use crate::Context;

/// Header carrying the caller's span identity.
pub const TRACEPARENT_HEADER: &str = "traceparent";

const SUPPORTED_VERSION: u8 = 0;
const MAX_VERSION: u8 = 254;
const TRACE_PARENT_FIELDS: [&str; 1] = [TRACEPARENT_HEADER];

/// Propagator for the `traceparent` header.
///
/// Injection writes the active span's identity; extraction reconstructs it
/// as a remote span context. Malformed headers are dropped silently, leaving
/// the receiving side to start a new trace, so a bad client can never break
/// a server.
#[derive(Clone, Debug, Default)]
pub struct TraceContextPropagator {
    _private: (),
}

impl TraceContextPropagator {
    /// Create a new `TraceContextPropagator`.
    pub fn new() -> Self {
        TraceContextPropagator { _private: () }
    }

    fn extract_span_context(&self, extractor: &dyn Extractor) -> Result<SpanContext, ()> {
        let header_value = extractor.get(TRACEPARENT_HEADER).unwrap_or("").trim();
        let parts = header_value.split_terminator('-').collect::<Vec<&str>>();
        if parts.len() < 4 {
            return Err(());
        }

        // For version 0 there must be exactly 4 parts; future versions may
        // append more but must still be parseable as a prefix.
        if parts[0].len() != 2 {
            return Err(());
        }
        let version = u8::from_str_radix(parts[0], 16).map_err(|_| ())?;
        if version > MAX_VERSION || version == SUPPORTED_VERSION && parts.len() != 4 {
            return Err(());
        }

        // Ids must be full-width lowercase hex.
        if parts[1].len() != 32 || parts[1].chars().any(|c| c.is_ascii_uppercase()) {
            return Err(());
        }
        let trace_id = TraceId::from_hex(parts[1]).map_err(|_| ())?;

        if parts[2].len() != 16 || parts[2].chars().any(|c| c.is_ascii_uppercase()) {
            return Err(());
        }
        let span_id = SpanId::from_hex(parts[2]).map_err(|_| ())?;

        if parts[3].len() != 2 {
            return Err(());
        }
        let opts = u8::from_str_radix(parts[3], 16).map_err(|_| ())?;
        if version == SUPPORTED_VERSION && opts > 2 {
            return Err(());
        }

        let span_context = SpanContext::new(trace_id, span_id, true);
        if span_context.is_valid() {
            Ok(span_context)
        } else {
            Err(())
        }
    }
}

impl TextMapPropagator for TraceContextPropagator {
    /// Writes the active span's identity into the carrier. Contexts without
    /// a valid span inject nothing.
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span_context = cx.span().span_context().clone();
        if span_context.is_valid() {
            let header_value = format!(
                "{:02x}-{}-{}-01",
                SUPPORTED_VERSION,
                span_context.trace_id(),
                span_context.span_id(),
            );
            injector.set(TRACEPARENT_HEADER, header_value);
        }
    }

    /// Rebuilds a remote span context from the carrier, layered over `cx`.
    /// A missing or malformed header returns `cx` unchanged.
    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        self.extract_span_context(extractor)
            .map(|remote| cx.with_remote_span_context(remote))
            .unwrap_or_else(|_| cx.clone())
    }

    fn fields(&self) -> &'static [&'static str] {
        &TRACE_PARENT_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[rustfmt::skip]
    fn extract_data() -> Vec<(&'static str, SpanContext)> {
        vec![
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00", SpanContext::new(TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(), SpanId::from_hex("00f067aa0ba902b7").unwrap(), true)),
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01", SpanContext::new(TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(), SpanId::from_hex("00f067aa0ba902b7").unwrap(), true)),
            ("02-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-ff", SpanContext::new(TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(), SpanId::from_hex("00f067aa0ba902b7").unwrap(), true)),
            ("02-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-what-the-future-will-be-like", SpanContext::new(TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(), SpanId::from_hex("00f067aa0ba902b7").unwrap(), true)),
        ]
    }

    #[rustfmt::skip]
    fn extract_data_invalid() -> Vec<(&'static str, &'static str)> {
        vec![
            ("0000-00000000000000000000000000000000-0000000000000000-01", "wrong version length"),
            ("00-ab00000000000000000000000000000000-cd00000000000000-01", "wrong trace id length"),
            ("00-ab000000000000000000000000000000-cd0000000000000000-01", "wrong span id length"),
            ("00-zb000000000000000000000000000000-cd00000000000000-01", "invalid character in trace id"),
            ("00-ab000000000000000000000000000000-cd0000000000000x-01", "invalid character in span id"),
            ("00-ab000000000000000000000000000000-cd00000000000000-0x", "invalid character in flags"),
            ("qw-00000000000000000000000000000000-0000000000000000-01", "invalid version"),
            ("ff-00000000000000000000000000000000-0000000000000000-01", "version too high"),
            ("00-00000000000000000000000000000000-0000000000000000-01", "zero trace id and span id"),
            ("00-ab000000000000000000000000000000-cd00000000000000-09", "bug in version 0 flags"),
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-extra", "version 0 with unsupported extra field"),
            ("00-4BF92F3577B34DA6A3CE929D0E0E4736-00f067aa0ba902b7-01", "uppercase trace id"),
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00F067AA0BA902B7-01", "uppercase span id"),
            ("", "empty header"),
            ("gibberish", "not a traceparent at all"),
        ]
    }

    #[test]
    fn extract_valid_headers() {
        let propagator = TraceContextPropagator::new();
        for (header, expected) in extract_data() {
            let mut carrier = HashMap::new();
            carrier.insert(TRACEPARENT_HEADER.to_owned(), header.to_owned());
            let cx = propagator.extract(&carrier);
            assert_eq!(cx.span().span_context(), &expected, "{header}");
            assert!(cx.span().span_context().is_remote());
        }
    }

    #[test]
    fn extract_rejects_invalid_headers() {
        let propagator = TraceContextPropagator::new();
        for (header, reason) in extract_data_invalid() {
            let mut carrier = HashMap::new();
            carrier.insert(TRACEPARENT_HEADER.to_owned(), header.to_owned());
            let cx = propagator.extract(&carrier);
            assert_eq!(
                cx.span().span_context(),
                &SpanContext::NONE,
                "{reason}: {header}"
            );
        }
    }

    #[test]
    fn extract_without_header_returns_given_context() {
        let propagator = TraceContextPropagator::new();
        let carrier: HashMap<String, String> = HashMap::new();
        let cx = propagator.extract(&carrier);
        assert!(!cx.has_active_span());
    }

    #[test]
    fn inject_writes_active_identity() {
        let propagator = TraceContextPropagator::new();
        let remote = SpanContext::new(TraceId::from(0xab0u128), SpanId::from(0xcd0u64), true);
        let cx = Context::new().with_remote_span_context(remote);

        let mut carrier = HashMap::new();
        propagator.inject_context(&cx, &mut carrier);
        assert_eq!(
            Extractor::get(&carrier, TRACEPARENT_HEADER),
            Some("00-00000000000000000000000000000ab0-0000000000000cd0-01")
        );
    }

    #[test]
    fn inject_skips_invalid_context() {
        let propagator = TraceContextPropagator::new();
        let mut carrier: HashMap<String, String> = HashMap::new();
        propagator.inject_context(&Context::new(), &mut carrier);
        assert!(carrier.is_empty());
    }

    #[test]
    fn inject_then_extract_round_trips() {
        let propagator = TraceContextPropagator::new();
        let remote = SpanContext::new(TraceId::from(0x1234u128), SpanId::from(0x5678u64), true);
        let cx = Context::new().with_remote_span_context(remote.clone());

        let mut carrier = HashMap::new();
        propagator.inject_context(&cx, &mut carrier);
        let extracted = propagator.extract(&carrier);

        assert_eq!(extracted.span().span_context(), &remote);
    }
}

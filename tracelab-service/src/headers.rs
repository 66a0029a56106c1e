//! Carrier adapters over [`http::HeaderMap`] for the propagation traits.
use http::{HeaderMap, HeaderName, HeaderValue};
use tracelab::propagation::{Extractor, Injector};

/// Helper for injecting context fields into outbound request headers.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Set a key and value in the `HeaderMap`. Does nothing if the key or
    /// value are not valid header material.
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Helper for extracting context fields from inbound request headers.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Get a value for a key from the `HeaderMap`. If the value is not
    /// valid ASCII, returns `None`.
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    /// Collect all the keys from the `HeaderMap`.
    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelab::propagation::{TextMapPropagator, TraceContextPropagator, TRACEPARENT_HEADER};
    use tracelab::trace::{SpanContext, SpanId, TraceContextExt, TraceId};
    use tracelab::Context;

    #[test]
    fn round_trip_through_header_map() {
        let propagator = TraceContextPropagator::new();
        let remote = SpanContext::new(TraceId::from(0xfaceu128), SpanId::from(0xbeefu64), true);
        let cx = Context::new().with_remote_span_context(remote.clone());

        let mut headers = HeaderMap::new();
        propagator.inject_context(&cx, &mut HeaderInjector(&mut headers));
        assert!(headers.contains_key(TRACEPARENT_HEADER));

        let extracted = propagator.extract(&HeaderExtractor(&headers));
        assert_eq!(extracted.span().span_context(), &remote);
    }

    #[test]
    fn non_ascii_header_value_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            TRACEPARENT_HEADER,
            HeaderValue::from_bytes(b"\xff\xfe").unwrap(),
        );
        assert_eq!(HeaderExtractor(&headers).get(TRACEPARENT_HEADER), None);
    }
}

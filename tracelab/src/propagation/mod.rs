//! # Context Propagation
//!
//! Cross-process propagation moves the active span's identity into a
//! carrier (typically HTTP headers) on the sending side and rebuilds a
//! remote parent context from the carrier on the receiving side. Without
//! this, each service starts its own disconnected trace.
//!
//! The carrier is abstracted behind [`Injector`] and [`Extractor`] so the
//! same propagator works over header maps, hash maps, or anything else that
//! stores string pairs.
use std::collections::HashMap;

mod trace_context;

pub use trace_context::{TraceContextPropagator, TRACEPARENT_HEADER};

use crate::Context;

/// Injector provides an interface for adding fields to an outbound carrier.
pub trait Injector {
    /// Add a key and value to the carrier.
    fn set(&mut self, key: &str, value: String);
}

/// Extractor provides an interface for reading fields from an inbound
/// carrier.
pub trait Extractor {
    /// Get a value for a key from the carrier.
    fn get(&self, key: &str) -> Option<&str>;

    /// Collect all the keys in the carrier.
    fn keys(&self) -> Vec<&str>;
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    fn keys(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect()
    }
}

/// A propagator that reads and writes context identity as text fields.
///
/// Extraction never fails: a missing or malformed carrier field yields the
/// given context unchanged, so the receiving side simply starts a new trace.
pub trait TextMapPropagator: Send + Sync + std::fmt::Debug {
    /// Inject the given context into the carrier.
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector);

    /// Inject the current context into the carrier.
    fn inject(&self, injector: &mut dyn Injector) {
        Context::map_current(|cx| self.inject_context(cx, injector))
    }

    /// Build a context from the carrier, on top of the given context.
    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context;

    /// Build a context from the carrier, on top of an empty context.
    fn extract(&self, extractor: &dyn Extractor) -> Context {
        self.extract_with_context(&Context::new(), extractor)
    }

    /// Carrier field names this propagator reads and writes.
    fn fields(&self) -> &'static [&'static str];
}

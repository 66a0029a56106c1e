//! # Tracer Provider
//!
//! The [`TracerProvider`] is the wiring point of the pipeline: it owns the
//! span processors and the id generator, and every [`Tracer`] it hands out
//! shares them. Cloning a provider clones a reference, not the pipeline.
//!
//! Processor registration is deliberately explicit. There is no implicit
//! global default: a provider built without [`with_span_processor`] or
//! [`with_simple_exporter`] silently drops every finished span, and callers
//! that depend on export should verify the wiring at startup via
//! [`TracerProvider::has_span_processors`].
//!
//! [`with_span_processor`]: TracerProviderBuilder::with_span_processor
//! [`with_simple_exporter`]: TracerProviderBuilder::with_simple_exporter
use crate::error::{TraceError, TraceResult};
use crate::trace::export::SpanExporter;
use crate::trace::id_generator::{IdGenerator, RandomIdGenerator};
use crate::trace::span::SpanData;
use crate::trace::span_processor::{SimpleSpanProcessor, SpanProcessor};
use crate::trace::tracer::Tracer;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct TracerProviderInner {
    processors: Vec<Box<dyn SpanProcessor>>,
    id_generator: Box<dyn IdGenerator>,
    is_shutdown: AtomicBool,
}

impl TracerProviderInner {
    fn shutdown(&self) -> Vec<TraceResult<()>> {
        self.processors
            .iter()
            .map(|processor| processor.shutdown())
            .collect()
    }
}

impl Drop for TracerProviderInner {
    fn drop(&mut self) {
        if !self.is_shutdown.load(Ordering::Relaxed) {
            for result in self.shutdown() {
                if let Err(err) = result {
                    tracing::debug!("span processor shutdown on drop failed: {err}");
                }
            }
        }
    }
}

/// Creator and registry of named [`Tracer`] instances.
///
/// Dropping the last reference shuts the pipeline down; [`shutdown`] does
/// the same explicitly and reports processor errors.
///
/// [`shutdown`]: TracerProvider::shutdown
#[derive(Clone, Debug)]
pub struct TracerProvider {
    inner: Arc<TracerProviderInner>,
}

impl Default for TracerProvider {
    fn default() -> Self {
        TracerProvider::builder().build()
    }
}

impl TracerProvider {
    /// Create a new [`TracerProvider`] builder.
    pub fn builder() -> TracerProviderBuilder {
        TracerProviderBuilder::default()
    }

    /// Returns a new tracer with the given instrumentation name.
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> Tracer {
        Tracer::new(name.into(), self.clone())
    }

    /// Returns `true` if at least one span processor is attached.
    ///
    /// A provider without processors exports nothing; services that depend
    /// on span collection should treat `false` as a startup configuration
    /// error rather than discovering an empty buffer later.
    pub fn has_span_processors(&self) -> bool {
        !self.inner.processors.is_empty()
    }

    pub(crate) fn span_processors(&self) -> &[Box<dyn SpanProcessor>] {
        &self.inner.processors
    }

    pub(crate) fn id_generator(&self) -> &dyn IdGenerator {
        self.inner.id_generator.as_ref()
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed)
    }

    /// Hand a finished span to every attached processor, in registration
    /// order.
    pub(crate) fn export_span(&self, span: SpanData) {
        if self.is_shutdown() {
            return;
        }
        if let Some((last, rest)) = self.inner.processors.split_last() {
            for processor in rest {
                processor.on_end(span.clone());
            }
            last.on_end(span);
        }
    }

    /// Ask every processor to flush spans it may be holding back.
    pub fn force_flush(&self) -> Vec<TraceResult<()>> {
        self.span_processors()
            .iter()
            .map(|processor| processor.force_flush())
            .collect()
    }

    /// Shut the pipeline down, flushing processors and exporters.
    ///
    /// Subsequent spans are dropped. Returns the first processor error, if
    /// any; calling `shutdown` a second time returns
    /// [`TraceError::AlreadyShutdown`].
    pub fn shutdown(&self) -> TraceResult<()> {
        if self.inner.is_shutdown.swap(true, Ordering::SeqCst) {
            return Err(TraceError::AlreadyShutdown);
        }
        self.inner
            .shutdown()
            .into_iter()
            .find(Result::is_err)
            .unwrap_or(Ok(()))
    }
}

/// Builder for [`TracerProvider`].
#[derive(Debug, Default)]
pub struct TracerProviderBuilder {
    processors: Vec<Box<dyn SpanProcessor>>,
    id_generator: Option<Box<dyn IdGenerator>>,
}

impl TracerProviderBuilder {
    /// Attach a span processor. Processors receive every finished span in
    /// registration order.
    pub fn with_span_processor<P: SpanProcessor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Attach a [`SimpleSpanProcessor`] wrapping the given exporter, which
    /// receives each span synchronously the moment it finishes.
    pub fn with_simple_exporter<E: SpanExporter + 'static>(self, exporter: E) -> Self {
        self.with_span_processor(SimpleSpanProcessor::new(Box::new(exporter)))
    }

    /// Replace the default random id generator.
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, id_generator: G) -> Self {
        self.id_generator = Some(Box::new(id_generator));
        self
    }

    /// Build the provider.
    pub fn build(self) -> TracerProvider {
        TracerProvider {
            inner: Arc::new(TracerProviderInner {
                processors: self.processors,
                id_generator: self
                    .id_generator
                    .unwrap_or_else(|| Box::<RandomIdGenerator>::default()),
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}

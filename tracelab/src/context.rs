//! Execution-scoped context for carrying the active span.
use crate::trace::context::SynchronizedSpan;
use pin_project_lite::pin_project;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

thread_local! {
    static CURRENT_CONTEXT: RefCell<Context> = RefCell::new(Context::default());
}

/// An execution-scoped value carrying the currently active span.
///
/// `Context`s are immutable; deriving a context with a new span produces a
/// new value and leaves the original untouched. The *current* context is
/// tracked per thread: [`attach`] installs a context for the enclosing
/// scope and the returned [`ContextGuard`] restores the previous one on
/// drop, so nested scopes compose and concurrent requests on different
/// threads (or tasks, via [`FutureExt::with_context`]) never share state.
///
/// [`attach`]: Context::attach()
///
/// # Examples
///
/// ```
/// use tracelab::{Context, TraceContextExt};
///
/// // No span is active by default.
/// assert!(!Context::current().has_active_span());
/// ```
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) span: Option<Arc<SynchronizedSpan>>,
}

impl Context {
    /// Creates an empty `Context` with no active span.
    pub fn new() -> Self {
        Context::default()
    }

    /// Returns an immutable snapshot of the current thread's context.
    pub fn current() -> Self {
        Context::map_current(|cx| cx.clone())
    }

    /// Applies a function to the current context, returning its value.
    ///
    /// Avoids the clone of [`Context::current`] when only a read is needed.
    /// Panics if a new context is attached while the current one is still
    /// borrowed.
    pub fn map_current<T>(f: impl FnOnce(&Context) -> T) -> T {
        CURRENT_CONTEXT.with(|cx| f(&cx.borrow()))
    }

    /// Replaces the current context on this thread with this context.
    ///
    /// Dropping the returned [`ContextGuard`] restores the previous context,
    /// which re-activates the previous span for the scope. The guard must be
    /// bound to a named variable (`let _guard = ...`) or it is dropped
    /// immediately.
    pub fn attach(self) -> ContextGuard {
        let previous_cx = CURRENT_CONTEXT
            .try_with(|current| current.replace(self))
            .ok();

        ContextGuard {
            previous_cx,
            _marker: PhantomData,
        }
    }

    pub(crate) fn current_with_synchronized_span(value: SynchronizedSpan) -> Self {
        Context {
            span: Some(Arc::new(value)),
        }
    }

    pub(crate) fn with_synchronized_span(&self, value: SynchronizedSpan) -> Self {
        Context {
            span: Some(Arc::new(value)),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("has_span", &self.span.is_some())
            .finish()
    }
}

/// A guard that resets the current context to the prior context when dropped.
#[allow(missing_debug_implementations)]
pub struct ContextGuard {
    previous_cx: Option<Context>,
    // ensure this type is !Send as it relies on thread locals
    _marker: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous_cx) = self.previous_cx.take() {
            let _ = CURRENT_CONTEXT.try_with(|current| current.replace(previous_cx));
        }
    }
}

pin_project! {
    /// A future with an associated tracing [`Context`].
    ///
    /// The context is re-attached around every poll, so the span it carries
    /// stays current across suspension points, including while an outbound
    /// call is in flight.
    #[derive(Clone, Debug)]
    pub struct WithContext<T> {
        #[pin]
        inner: T,
        cx: Context,
    }
}

impl<T: std::future::Future> std::future::Future for WithContext<T> {
    type Output = T::Output;

    fn poll(self: Pin<&mut Self>, task_cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.cx.clone().attach();

        this.inner.poll(task_cx)
    }
}

/// Extension trait allowing futures to be traced with a span.
pub trait FutureExt: Sized {
    /// Attaches the provided [`Context`] to this future, returning a
    /// [`WithContext`] wrapper that makes it current while being polled.
    fn with_context(self, cx: Context) -> WithContext<Self> {
        WithContext { inner: self, cx }
    }
}

impl<T: Sized> FutureExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanContext, SpanId, TraceContextExt, TraceId};

    fn remote_context(trace: u128, span: u64) -> Context {
        Context::new().with_remote_span_context(SpanContext::new(
            TraceId::from(trace),
            SpanId::from(span),
            true,
        ))
    }

    #[test]
    fn nested_contexts_restore_previous() {
        let _outer = remote_context(1, 1).attach();
        assert_eq!(
            Context::current().span().span_context().trace_id(),
            TraceId::from(1u128)
        );

        {
            let _inner = remote_context(2, 2).attach();
            assert_eq!(
                Context::current().span().span_context().trace_id(),
                TraceId::from(2u128)
            );
        }

        // Inner guard dropped, outer context is current again.
        assert_eq!(
            Context::current().span().span_context().trace_id(),
            TraceId::from(1u128)
        );
    }

    #[tokio::test]
    async fn context_survives_await_points() {
        let cx = remote_context(7, 7);
        let trace_id = async {
            tokio::task::yield_now().await;
            Context::current().span().span_context().trace_id()
        }
        .with_context(cx)
        .await;

        assert_eq!(trace_id, TraceId::from(7u128));
        assert!(!Context::current().has_active_span());
    }
}

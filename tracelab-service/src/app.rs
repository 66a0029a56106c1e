//! HTTP surface exercising the tracing pipeline end to end.
//!
//! Every traced handler follows the same shape: start a span, run the
//! handler body under a context carrying that span, end the span, send the
//! response. Because the provider uses a simple (synchronous) processor, a
//! handler's span is visible in the exporter buffer before its response
//! reaches the client.
use crate::config::ExporterKind;
use crate::error::ServiceError;
use crate::headers::{HeaderExtractor, HeaderInjector};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracelab::propagation::{TextMapPropagator, TraceContextPropagator};
use tracelab::trace::{
    ConsoleSpanExporter, InMemorySpanExporter, SpanData, SpanKind, Status, Tracer, TracerProvider,
};
use tracelab::{Context, FutureExt, KeyValue, TraceContextExt, Value};

/// Build the tracing pipeline the service runs on.
///
/// The in-memory exporter is always attached because the `/spans` endpoint
/// drains it; the console exporter is layered on top when requested.
pub fn build_pipeline(kind: ExporterKind) -> (TracerProvider, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let mut builder = TracerProvider::builder().with_simple_exporter(exporter.clone());
    if kind == ExporterKind::MemoryAndConsole {
        builder = builder.with_simple_exporter(ConsoleSpanExporter::new());
    }
    (builder.build(), exporter)
}

/// Shared per-process state handed to every request handler.
#[derive(Debug)]
pub struct AppState {
    tracer: Tracer,
    exporter: InMemorySpanExporter,
    propagator: TraceContextPropagator,
    client: Client<HttpConnector, Full<Bytes>>,
    self_addr: SocketAddr,
}

impl AppState {
    /// Wire the handlers to a provider and exporter.
    ///
    /// Fails loudly if the provider has no span processors: with nothing
    /// attached every span would be dropped silently and `/spans` would
    /// always be empty, which is a deployment mistake rather than a state
    /// worth serving.
    pub fn new(
        provider: &TracerProvider,
        exporter: InMemorySpanExporter,
        self_addr: SocketAddr,
    ) -> Result<Arc<Self>, ServiceError> {
        if !provider.has_span_processors() {
            return Err(ServiceError::Configuration(
                "tracer provider has no span processors attached; all spans would be dropped"
                    .to_owned(),
            ));
        }
        Ok(Arc::new(AppState {
            tracer: provider.tracer("tracelab-service"),
            exporter,
            propagator: TraceContextPropagator::new(),
            client: Client::builder(TokioExecutor::new()).build_http(),
            self_addr,
        }))
    }

    /// Like [`AppState::new`] but without the processor check, for
    /// observing how an unwired pipeline behaves.
    pub fn new_unchecked(
        provider: &TracerProvider,
        exporter: InMemorySpanExporter,
        self_addr: SocketAddr,
    ) -> Arc<Self> {
        Arc::new(AppState {
            tracer: provider.tracer("tracelab-service"),
            exporter,
            propagator: TraceContextPropagator::new(),
            client: Client::builder(TokioExecutor::new()).build_http(),
            self_addr,
        })
    }
}

/// Accept loop: one spawned task per connection.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServiceError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle(req, state).await) }
            });
            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::debug!(%peer_addr, "connection closed with error: {err}");
            }
        });
    }
}

/// Route one request.
pub async fn handle(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let path = req.uri().path().to_owned();
    tracing::debug!(method = %req.method(), %path, "handling request");

    match (req.method(), path.as_str()) {
        (&Method::GET, "/") => root(&state),
        (&Method::GET, "/error") => error_endpoint(&state),
        (&Method::GET, "/downstream") => downstream(&state).await,
        (&Method::GET, "/spans") => spans(&state),
        (&Method::GET, "/health") => health(),
        (&Method::GET, p) => match p.strip_prefix("/echo/") {
            Some(original_trace_id) => echo(&state, req.headers(), original_trace_id),
            None => not_found(),
        },
        _ => not_found(),
    }
}

fn root(state: &AppState) -> Response<Full<Bytes>> {
    let mut span = state
        .tracer
        .span_builder("root_endpoint")
        .with_kind(SpanKind::Server)
        .with_attributes([KeyValue::new("endpoint", "root")])
        .start(&state.tracer);
    let body = json!({ "message": "Hello from the traced service" });
    span.end();
    json_response(StatusCode::OK, &body)
}

// Completes normally: failures here would be business-logic bugs, not part
// of the handler's contract.
fn error_endpoint(state: &AppState) -> Response<Full<Bytes>> {
    let mut span = state
        .tracer
        .span_builder("error_endpoint")
        .with_kind(SpanKind::Server)
        .with_attributes([KeyValue::new("endpoint", "error")])
        .start(&state.tracer);
    span.set_status(Status::Ok);
    span.end();
    json_response(StatusCode::OK, &json!({ "status": "ok" }))
}

/// Calls `/echo/{trace_id}` on this same service with the active span's
/// identity injected into the outbound headers, proving that two
/// independently handled requests can agree on one trace.
async fn downstream(state: &AppState) -> Response<Full<Bytes>> {
    let span = state
        .tracer
        .span_builder("downstream_request")
        .with_kind(SpanKind::Client)
        .with_attributes([KeyValue::new("endpoint", "downstream")])
        .start(&state.tracer);
    let trace_id = span.span_context().trace_id();
    let cx = Context::current_with_span(span);

    let response = match call_echo(state, &cx, &trace_id.to_string()).await {
        Ok(payload) => json_response(
            StatusCode::OK,
            &json!({ "downstream_response": payload }),
        ),
        Err(err) => {
            tracing::warn!("downstream call failed: {err}");
            cx.span().set_status(Status::error(err.to_string()));
            json_response(StatusCode::BAD_GATEWAY, &json!({ "error": err.to_string() }))
        }
    };
    // Ended on both branches, after the outbound hop has fully resolved.
    cx.span().end();
    response
}

async fn call_echo(
    state: &AppState,
    cx: &Context,
    trace_id: &str,
) -> Result<serde_json::Value, ServiceError> {
    let uri = format!("http://{}/echo/{trace_id}", state.self_addr);
    let mut outbound = Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .body(Full::new(Bytes::new()))
        .map_err(|err| ServiceError::DownstreamCall(err.to_string()))?;
    state
        .propagator
        .inject_context(cx, &mut HeaderInjector(outbound.headers_mut()));

    // The calling span stays current across the await.
    let response = state
        .client
        .request(outbound)
        .with_context(cx.clone())
        .await
        .map_err(|err| ServiceError::DownstreamCall(err.to_string()))?;
    if !response.status().is_success() {
        return Err(ServiceError::DownstreamCall(format!(
            "echo endpoint answered {}",
            response.status()
        )));
    }
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|err| ServiceError::DownstreamCall(err.to_string()))?
        .to_bytes();
    serde_json::from_slice(&body)
        .map_err(|err| ServiceError::DownstreamCall(format!("echo body was not JSON: {err}")))
}

/// Joins the caller's trace when a propagation header is present; starts a
/// fresh trace otherwise. The response compares the trace id the caller
/// believes it has (path segment) against the one actually in effect here,
/// so a propagation break is directly observable.
fn echo(state: &AppState, headers: &HeaderMap, original_trace_id: &str) -> Response<Full<Bytes>> {
    let parent_cx = state.propagator.extract(&HeaderExtractor(headers));
    let mut span = state
        .tracer
        .span_builder("echo_service")
        .with_kind(SpanKind::Server)
        .with_attributes([KeyValue::new("endpoint", "echo")])
        .start_with_context(&state.tracer, &parent_cx);
    let current_trace_id = span.span_context().trace_id().to_string();
    let body = json!({
        "original_trace_id": original_trace_id,
        "current_trace_id": current_trace_id,
        "context_propagated": original_trace_id == current_trace_id,
    });
    span.end();
    json_response(StatusCode::OK, &body)
}

/// Drains the exporter buffer. The handler's own span is still open while
/// the buffer is drained, so it shows up in the next drain, not this one.
fn spans(state: &AppState) -> Response<Full<Bytes>> {
    let mut span = state
        .tracer
        .span_builder("spans_endpoint")
        .with_kind(SpanKind::Server)
        .with_attributes([KeyValue::new("endpoint", "spans")])
        .start(&state.tracer);

    let response = match state.exporter.drain() {
        Ok(finished) => {
            let records: Vec<SpanRecord> = finished.iter().map(SpanRecord::from).collect();
            json_response(StatusCode::OK, &json!({ "spans": records }))
        }
        Err(err) => {
            tracing::error!("failed to read span buffer: {err}");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "span buffer unavailable" }),
            )
        }
    };
    span.end();
    response
}

fn health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &json!({ "status": "healthy" }))
}

fn not_found() -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found" }))
}

/// Flat wire form of one finished span, as served by `/spans`.
#[derive(Serialize, Debug)]
struct SpanRecord {
    name: String,
    trace_id: String,
    span_id: String,
    parent_id: Option<String>,
    attributes: serde_json::Map<String, serde_json::Value>,
    status: &'static str,
    kind: &'static str,
}

impl From<&SpanData> for SpanRecord {
    fn from(span: &SpanData) -> Self {
        SpanRecord {
            name: span.name.to_string(),
            trace_id: span.span_context.trace_id().to_string(),
            span_id: span.span_context.span_id().to_string(),
            parent_id: span.parent_id().map(|id| id.to_string()),
            attributes: span
                .attributes
                .iter()
                .map(|kv| (kv.key.to_string(), attribute_value(&kv.value)))
                .collect(),
            status: span.status.as_str(),
            kind: span.span_kind.as_str(),
        }
    }
}

fn attribute_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => serde_json::Value::from(*v),
        Value::I64(v) => serde_json::Value::from(*v),
        Value::F64(v) => serde_json::Value::from(*v),
        Value::String(v) => serde_json::Value::from(v.as_ref()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = Response::new(Full::new(Bytes::from(bytes)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            tracing::error!("failed to serialize response body: {err}");
            let mut response = Response::new(Full::new(Bytes::from_static(
                br#"{"error":"response serialization failed"}"#,
            )));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelab::trace::{SpanContext, SpanId, TraceId};
    use std::time::SystemTime;

    #[test]
    fn span_record_flattens_identity_and_attributes() {
        let now = SystemTime::now();
        let data = SpanData {
            span_context: SpanContext::new(TraceId::from(0xabu128), SpanId::from(0xcdu64), false),
            parent_span_id: SpanId::from(0x12u64),
            span_kind: SpanKind::Server,
            name: "root_endpoint".into(),
            start_time: now,
            end_time: now,
            attributes: vec![
                KeyValue::new("endpoint", "root"),
                KeyValue::new("attempt", 2i64),
            ],
            status: Status::Ok,
        };

        let record = SpanRecord::from(&data);
        assert_eq!(record.name, "root_endpoint");
        assert_eq!(record.trace_id, format!("{:032x}", 0xab));
        assert_eq!(record.span_id, format!("{:016x}", 0xcd));
        assert_eq!(record.parent_id.as_deref(), Some(format!("{:016x}", 0x12).as_str()));
        assert_eq!(record.attributes["endpoint"], "root");
        assert_eq!(record.attributes["attempt"], 2);
        assert_eq!(record.status, "ok");
        assert_eq!(record.kind, "server");
    }

    #[test]
    fn root_span_record_has_null_parent() {
        let now = SystemTime::now();
        let data = SpanData {
            span_context: SpanContext::new(TraceId::from(1u128), SpanId::from(1u64), false),
            parent_span_id: SpanId::INVALID,
            span_kind: SpanKind::Internal,
            name: "solo".into(),
            start_time: now,
            end_time: now,
            attributes: Vec::new(),
            status: Status::Unset,
        };
        assert_eq!(SpanRecord::from(&data).parent_id, None);
    }
}

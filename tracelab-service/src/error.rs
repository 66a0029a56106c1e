use std::net::AddrParseError;

/// Errors surfaced by the service itself (as opposed to the tracing
/// pipeline, which reports through `tracelab::TraceError`).
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    /// The service was configured in a way that cannot work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The listen address could not be parsed.
    #[error("invalid listen address: {0}")]
    ListenAddr(#[from] AddrParseError),

    /// An outbound call to another endpoint failed.
    #[error("downstream call failed: {0}")]
    DownstreamCall(String),

    /// Binding or accepting on the listen socket failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The tracing pipeline reported a failure.
    #[error(transparent)]
    Trace(#[from] tracelab::TraceError),
}

//! Environment-driven configuration.
use crate::error::ServiceError;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

const LISTEN_ADDR_ENV: &str = "TRACELAB_LISTEN_ADDR";
const EXPORTER_ENV: &str = "TRACELAB_EXPORTER";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";

/// Which span exporter the service wires into its provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExporterKind {
    /// Buffer spans in memory and serve them from the inspection endpoint.
    #[default]
    Memory,
    /// Additionally print each finished span to stdout.
    MemoryAndConsole,
}

/// Runtime configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Exporter selection.
    pub exporter: ExporterKind,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// `TRACELAB_LISTEN_ADDR` defaults to `127.0.0.1:8000`;
    /// `TRACELAB_EXPORTER` accepts `memory` (default) or `console`.
    /// Unrecognized values are rejected rather than silently defaulted.
    pub fn from_env() -> Result<Self, ServiceError> {
        let listen_addr = match env::var(LISTEN_ADDR_ENV) {
            Ok(value) => SocketAddr::from_str(&value)?,
            Err(_) => SocketAddr::from_str(DEFAULT_LISTEN_ADDR)?,
        };

        let exporter = match env::var(EXPORTER_ENV) {
            Ok(value) => match value.to_lowercase().as_str() {
                "memory" => ExporterKind::Memory,
                "console" => ExporterKind::MemoryAndConsole,
                other => {
                    return Err(ServiceError::Configuration(format!(
                        "{EXPORTER_ENV} must be `memory` or `console`, got `{other}`"
                    )))
                }
            },
            Err(_) => ExporterKind::default(),
        };

        Ok(Config {
            listen_addr,
            exporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var based tests mutate process state; keep them to parsing logic
    // that does not touch the environment.
    #[test]
    fn default_listen_addr_parses() {
        let addr = SocketAddr::from_str(DEFAULT_LISTEN_ADDR).unwrap();
        assert_eq!(addr.port(), 8000);
        assert!(addr.ip().is_loopback());
    }
}

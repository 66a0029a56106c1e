use tokio::net::TcpListener;
use tracelab_service::{build_pipeline, serve, AppState, Config, ServiceError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let (provider, exporter) = build_pipeline(config.exporter);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let local_addr = listener.local_addr()?;
    let state = AppState::new(&provider, exporter, local_addr)?;
    tracing::info!(%local_addr, exporter = ?config.exporter, "listening");

    tokio::select! {
        result = serve(listener, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    provider.shutdown()?;
    Ok(())
}

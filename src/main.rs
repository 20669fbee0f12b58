//! The POI proxy's web server.

use poi_proxy::{config::Config, AppState};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

/// # Errors
///
/// See implementation.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let address = config.address.clone();

    tracing::info!(backend = %config.backend.url, "Loaded configuration");

    let state = AppState::new(config)?;

    tracing::info!("Listening to {address}...");

    let listener = TcpListener::bind(&address).await?;

    tracing::info!("Ready!");

    axum::serve(listener, poi_proxy::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");

    Ok(())
}

/// Resolves once the process is asked to stop, by Ctrl+C or (on Unix) `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(error) => {
                tracing::error!(%error, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

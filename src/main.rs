use toolroute::config::Config;
use toolroute::embedding::HashingEmbedder;
use toolroute::handlers::api_router;
use toolroute::ingestion::{apply_bootstrap, load_bootstrap};
use toolroute::server::serve_with_drain;
use toolroute::state::AppState;

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolroute=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting toolroute service");

    let config = Config::from_env()?;
    let shutdown_timeout = config.shutdown_timeout_secs;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let catalog_path = config.catalog_path.clone();

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    let embedder = Arc::new(HashingEmbedder::new(config.embedding_dim)?);
    let state = Arc::new(AppState::new(config, embedder));

    // Register bootstrap servers before reporting ready
    if let Some(path) = catalog_path {
        let start = std::time::Instant::now();
        let catalog = load_bootstrap(&path)?;
        let registered = apply_bootstrap(&state.catalog, catalog).await;
        tracing::info!(
            path = %path.display(),
            registered,
            tools = state.index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Bootstrap catalog applied",
        );
    }
    state.mark_ready();

    let app = api_router(Arc::clone(&state))
        .route(
            "/metrics",
            get(move || {
                let handle = prometheus_handle.clone();
                async move { handle.render() }
            }),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    serve_with_drain(
        listener,
        app,
        shutdown_signal(),
        Duration::from_secs(shutdown_timeout),
    )
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// Once this resolves axum stops accepting connections and waits for in-flight
/// requests for up to `SHUTDOWN_TIMEOUT` seconds.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

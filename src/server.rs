//! Serving with a bounded graceful shutdown.

use axum::Router;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve `app` until `shutdown` resolves, then stop accepting connections and
/// give in-flight requests up to `drain` to finish.
pub async fn serve_with_drain<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    drain: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    tokio::select! {
        result = server => result,
        _ = async {
            // A dropped sender means the server already ended
            if signalled_rx.await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!(drain_ms = drain.as_millis() as u64, "Draining connections...");
            tokio::time::sleep(drain).await;
        } => {
            tracing::warn!("Drain timeout elapsed, dropping remaining connections");
            Ok(())
        }
    }
}

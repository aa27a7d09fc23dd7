use super::api::{get_status, health_check, post_batch, IngestState};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: Arc<IngestState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/batches", post(post_batch))
        .route("/spool/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the ingest API on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: Arc<IngestState>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Ingest server shutting down gracefully");
        })
        .await
}

/// Bind `listen_addr` and serve the ingest API.
pub async fn start_server(
    listen_addr: SocketAddr,
    state: Arc<IngestState>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    info!(addr = %listen_addr, "Starting ingest HTTP server");

    let listener = TcpListener::bind(listen_addr).await?;
    serve(listener, state, shutdown).await
}

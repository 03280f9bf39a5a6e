//! Server setup and routing.

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{handlers, state::AppState};

/// Create the API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/health", get(handlers::handle_health))
        .route("/generate", post(handlers::handle_generate))
        .route("/stats", get(handlers::handle_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `host:port`. `host` may be a name such as `localhost`.
pub async fn bind_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

/// Run the HTTP server on `host:port` until Ctrl-C.
pub async fn run_server(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let listener = bind_listener(host, port).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

//! Web UI: an upload form, a result page and a small JSON API.
//!
//! | Route              | Purpose |
//! |--------------------|---------|
//! | `GET  /`           | upload form |
//! | `POST /convert`    | multipart upload → HTML result page |
//! | `POST /api/convert`| multipart upload → JSON [`crate::ConversionReport`] |
//! | `POST /download`   | form (`filename`, base64 `content`) → `.md` attachment |
//! | `GET  /healthz`    | liveness and converter availability |
//!
//! The server keeps no per-user state: the result page carries the Markdown
//! (base64-encoded) in its download form, so nothing outlives the request
//! that produced it.

pub mod form;
pub mod handlers;
pub mod markdown;
pub mod state;
pub mod template;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::AppState;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.orchestrator.settings().max_upload_bytes);

    Router::new()
        .route("/", get(handlers::index))
        .route("/convert", post(handlers::convert_page))
        .route("/api/convert", post(handlers::convert_api))
        .route("/download", post(handlers::download))
        .route("/healthz", get(handlers::healthz))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

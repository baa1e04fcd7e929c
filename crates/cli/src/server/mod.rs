//! HTTP trigger surface

mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use dispatcher::Fanouter;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::CliError;

/// Routes served in front of the fanout topology
pub fn router(fanouter: Arc<Fanouter>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/feeds", get(handlers::missing_feed))
        .route("/feeds/", get(handlers::missing_feed))
        .route("/feeds/{id}", get(handlers::trigger))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(fanouter)
}

/// Serve until `cancel` fires, then finish in-flight requests
pub async fn serve(
    listener: TcpListener,
    fanouter: Arc<Fanouter>,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    axum::serve(listener, router(fanouter))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(CliError::Server)?;

    info!("HTTP server stopped");
    Ok(())
}

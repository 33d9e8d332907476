//! Inbound side: the Feishu event callback endpoint.

pub mod events;
pub mod handler;
pub mod utils;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use crate::infrastructure::shutdown::ShutdownListener;

pub use handler::WebhookState;

pub const EVENT_PATH: &str = "/feishu_download";

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(EVENT_PATH, post(handler::receive_event))
        .route("/health", get(handler::health))
        .with_state(state)
}

/// Serves until `shutdown` fires, then drains in-flight requests.
pub async fn serve(
    bind: SocketAddr,
    state: Arc<WebhookState>,
    mut shutdown: ShutdownListener,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(target: "webhook", address = %bind, path = EVENT_PATH, "webhook server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await
        .context("webhook server failed")?;

    tracing::info!(target: "webhook", "webhook server stopped");
    Ok(())
}

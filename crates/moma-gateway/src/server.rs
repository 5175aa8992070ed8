// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use moma_core::{AttachmentAdapter, MomaError};
use moma_forwarder::Forwarder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub attachments: Arc<dyn AttachmentAdapter>,
    /// Upload bodies are cut off past this many bytes.
    pub max_attachment_bytes: u64,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        forwarder: Arc<Forwarder>,
        attachments: Arc<dyn AttachmentAdapter>,
        max_attachment_bytes: u64,
    ) -> Self {
        Self {
            forwarder,
            attachments,
            max_attachment_bytes,
            start_time: Instant::now(),
        }
    }
}

/// Builds the gateway router:
/// - POST /chat and /api/chat
/// - POST /attachments
/// - POST /actions
/// - GET /health
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handlers::post_chat))
        .route("/api/chat", post(handlers::post_chat))
        .route("/attachments", post(handlers::post_attachment))
        .route("/actions", post(handlers::post_actions))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `host:port` and serves `router` until Ctrl-C.
pub async fn start_server(host: &str, port: u16, router: Router) -> Result<(), MomaError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MomaError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MomaError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

//! # HTTP Server
//!
//! Receives registry push notifications and serves probes and metrics.
//!
//! Provides endpoints:
//! - `POST /hooks/{registry}` - push notification from `quay`, `dockerhub` (or `docker`) or `gcr`
//! - `POST /pushhook` - push notification from the registry chosen at startup
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (returns 200 once the listener is bound)
//!
//! Parse failures answer 400, pipeline failures 500 and an unknown registry 404.
//! Successful deliveries answer 200 with the [`UpdateOutcome`] as JSON.

use crate::hooks::ImageRegistry;
use crate::observability::metrics;
use crate::updater::{UpdateOutcome, Updater};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct ServerState {
    pub updater: Arc<Updater>,
    /// Registry format assumed by `/pushhook`
    pub default_registry: ImageRegistry,
    pub is_ready: Arc<AtomicBool>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

/// Build the router; separate from [`start_server`] so it can be driven in-process
pub fn build_router(state: Arc<ServerState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/hooks/{registry}", post(registry_hook_handler))
        .route("/pushhook", post(push_hook_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn start_server(
    port: u16,
    state: Arc<ServerState>,
    max_body_bytes: usize,
) -> Result<(), anyhow::Error> {
    let is_ready = Arc::clone(&state.is_ready);
    let app = build_router(state, max_body_bytes);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);
    is_ready.store(true, Ordering::Relaxed);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down HTTP server");
        })
        .await?;

    Ok(())
}

async fn registry_hook_handler(
    State(state): State<Arc<ServerState>>,
    Path(registry): Path<String>,
    body: Bytes,
) -> Response {
    match registry.parse::<ImageRegistry>() {
        Ok(registry) => handle_push(&state, registry, &body).await,
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

async fn push_hook_handler(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    handle_push(&state, state.default_registry, &body).await
}

async fn handle_push(state: &ServerState, registry: ImageRegistry, body: &[u8]) -> Response {
    metrics::increment_hooks_received(registry.as_str());

    let event = match registry.parse(body) {
        Ok(event) => event,
        Err(e) => {
            metrics::increment_hook_parse_errors(registry.as_str());
            warn!(%registry, error = %e, "rejected push notification");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match state.updater.update_from_hook(&event).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn outcome_response(outcome: UpdateOutcome) -> Response {
    (StatusCode::OK, Json(outcome)).into_response()
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_text() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {e}"),
            )
        }
    }
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

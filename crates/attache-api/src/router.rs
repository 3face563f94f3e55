//! HTTP router wiring and server entry point.

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::handlers;
use crate::state::AppState;

/// Builds the application router. The frontend is served from a different
/// origin during development, so CORS is wide open.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/parse-intent", post(handlers::parse_intent))
        .route("/api/agents/manifest", get(handlers::manifest))
        .route("/api/agents/select", post(handlers::select))
        .route("/api/agents/connect", post(handlers::connect))
        .route("/api/agents/execute", post(handlers::execute))
        .route("/api/dev/emit-node-log", post(handlers::emit_node_log))
        .route(
            "/api/dev/simulate-orchestration",
            post(handlers::simulate_orchestration),
        )
        .route("/ws", get(handlers::node_log_stream))
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until the task is cancelled.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "api server listening");

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

//! HTTP surface
//!
//! Exposes the engine's three operations as JSON POST routes plus a
//! health probe. Every failure becomes `{ "error": message }`.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use eyre::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::engine::Engine;

pub use handlers::{ArtifactResponse, ErrorBody, GenerateArtifactRequest, GoalRequest, HealthResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Build the application router
pub fn router(engine: Arc<Engine>) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = Uuid::now_v7();
        tracing::info_span!(
            "http",
            %request_id,
            method = %request.method(),
            path = %request.uri().path()
        )
    });

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/analyze-requirements", post(handlers::analyze_requirements))
        .route("/api/generate-graph", post(handlers::generate_graph))
        .route("/api/generate-artifact", post(handlers::generate_artifact))
        .layer(trace)
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

/// Bind and serve until the process is stopped
pub async fn serve(engine: Arc<Engine>, bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind {}", bind))?;
    let addr = listener.local_addr().context("Failed to read bound address")?;
    info!(%addr, configured = engine.is_configured(), "Listening");

    axum::serve(listener, router(engine)).await.context("Server error")?;
    Ok(())
}

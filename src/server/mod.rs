//! HTTP server assembly for the hub
//!
//! The hub is a library component meant to be embedded in a platform
//! backend; this module produces the axum router exposing its WebSocket
//! endpoint (admission-gated) plus a health endpoint, and a convenience
//! `serve` that binds and runs it standalone.

mod handler;

use crate::config::HubConfig;
use crate::core::auth::TokenVerifier;
use crate::hub::Hub;
use anyhow::Result;
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Build the hub's router
///
/// The WebSocket endpoint lives at `config.ws_path`; `/healthz` serves the
/// hub's live counters.
pub fn build_router(config: &HubConfig, hub: Arc<Hub>, verifier: Arc<dyn TokenVerifier>) -> Router {
    let state = AppState { hub, verifier };

    Router::new()
        .route(&config.ws_path, get(handler::ws_handler))
        .route("/healthz", get(handler::health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind `config.bind_addr` and serve the hub until the process exits
pub async fn serve(config: HubConfig, hub: Arc<Hub>, verifier: Arc<dyn TokenVerifier>) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, path = %config.ws_path, "hub listening");
    let app = build_router(&config, hub, verifier);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Install a `tracing` subscriber honoring `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

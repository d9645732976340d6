//! Dashboard — Axum web server for the ratio display.
//!
//! Serves a self-contained HTML page that polls the JSON snapshot
//! endpoint every refresh interval. CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::Html,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::DashboardConfig;
use routes::AppState;

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Bind the listener and serve in a background task.
///
/// Binding happens before spawning so a taken port fails startup.
pub async fn spawn_dashboard(state: AppState, cfg: &DashboardConfig) -> Result<SocketAddr> {
    let addr = format!("{}:{}", cfg.bind, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind dashboard on {addr}"))?;
    let local = listener
        .local_addr()
        .context("Failed to read dashboard address")?;

    let app = build_router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server stopped");
        }
    });

    info!(addr = %local, "Dashboard serving on http://{local}");
    Ok(local)
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/latest", get(routes::get_latest))
        .route("/health", get(routes::health))
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

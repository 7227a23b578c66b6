//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use dx_feed::registry::RefreshStats;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Coalescing counters per refresh path (`dxspider`, `hamqth`, `paths`).
    pub refresh: Vec<RefreshStats>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: "dx-runner",
        version: env!("CARGO_PKG_VERSION"),
        refresh: state.services.refresh_stats(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

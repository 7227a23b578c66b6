//! # dx-runner
//!
//! HTTP surface for the DX spot aggregator.
//!
//! - `GET /spots?source=&limit=`: spots from the preferred source chain
//! - `GET /spots/sources`: static list of `source` values for the UI
//! - `GET /spots/paths`: spotter → DX paths for the map
//! - `GET /health`: liveness and refresh coalescing counters
//!
//! Every route answers 200; upstream trouble shows up as an empty array.

use std::sync::Arc;

use axum::Router;
use dx_feed::registry::SpotServices;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<SpotServices>,
}

impl AppState {
    pub fn new(services: SpotServices) -> Self {
        Self { services: Arc::new(services) }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::spot_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

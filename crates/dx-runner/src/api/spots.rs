//! Spot, source-list and path endpoints.
//!
//! Query parameters are parsed leniently: an unknown `source` means `auto`
//! and an unparsable `limit` means the default, so the dashboard always gets
//! a 200 with a JSON array.

use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use dx_core::{DxPath, SourcePreference, Spot};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AppState;

pub const DEFAULT_LIMIT: usize = 25;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SpotsQuery {
    pub source: Option<String>,
    pub limit: Option<String>,
}

impl SpotsQuery {
    fn preference(&self) -> SourcePreference {
        let raw = self.source.as_deref().unwrap_or_default();
        raw.parse().unwrap_or_else(|_| {
            debug!("[api] unknown source {raw:?}, using auto");
            SourcePreference::Auto
        })
    }

    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }
}

/// One entry of `GET /spots/sources`.
#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// GET /spots
pub async fn get_spots(State(state): State<AppState>, Query(query): Query<SpotsQuery>) -> Json<Vec<Spot>> {
    let batch = state.services.selector.get_spots(query.preference()).await;
    Json(batch.iter().take(query.limit()).cloned().collect())
}

/// GET /spots/sources
pub async fn get_sources() -> Json<Vec<SourceInfo>> {
    Json(
        SourcePreference::ALL
            .iter()
            .map(|p| SourceInfo { id: p.id(), label: p.label(), description: p.description() })
            .collect(),
    )
}

/// GET /spots/paths
pub async fn get_paths(State(state): State<AppState>) -> Json<Vec<DxPath>> {
    let paths = state.services.paths.get_paths().await;
    Json(paths.to_vec())
}

pub fn spot_routes() -> Router<AppState> {
    Router::new()
        .route("/spots", get(get_spots))
        .route("/spots/sources", get(get_sources))
        .route("/spots/paths", get(get_paths))
}

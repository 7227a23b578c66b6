//! HTTP handlers.

mod health;
mod spots;

pub use health::{HealthResponse, health_check, health_routes};
pub use spots::{SourceInfo, SpotsQuery, get_paths, get_sources, get_spots, spot_routes};

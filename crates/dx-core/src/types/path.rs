//! Spotter → DX paths for map rendering.

use serde::{Deserialize, Serialize};

/// Approximate position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A spot whose two endpoints both resolved to a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DxPath {
    pub spotter: String,
    pub spotter_loc: LatLon,
    #[serde(rename = "dxCall")]
    pub dx: String,
    pub dx_loc: LatLon,
    #[serde(rename = "freq")]
    pub freq_mhz: String,
    pub comment: String,
    pub time: String,
}

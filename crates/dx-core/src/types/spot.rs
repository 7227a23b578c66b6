//! The normalized spot record shared by every upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::SpotSource;

/// One sighting report: `spotter` heard `dx_call` on `freq_mhz`.
///
/// Invariants established by the parsers in `dx-feed`:
/// - `spotter` and `dx_call` are non-empty and upper-case
/// - `freq_mhz` is positive and rendered with exactly three decimals
/// - `time` is formatted `HH:MMz`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    /// Station that reported the sighting.
    pub spotter: String,
    /// Station that was heard.
    #[serde(rename = "call")]
    pub dx_call: String,
    /// Frequency in MHz, e.g. `"14.074"`.
    #[serde(rename = "freq")]
    pub freq_mhz: String,
    /// Free-text comment (mode, signal report, ...).
    pub comment: String,
    /// Display time, e.g. `"14:23z"`.
    pub time: String,
    /// Upstream provenance.
    pub source: SpotSource,
    /// Full UTC observation time when the upstream carries a date.
    ///
    /// Internal only; the dashboard never sees it.
    #[serde(skip)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl Spot {
    /// Dedup key within one acquisition session.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.dx_call, &self.freq_mhz)
    }
}

//! Spotter → DX path composition for the map view.
//!
//! Reads HamQTH spots only. A path is emitted for a spot only when both of
//! its endpoints resolve through the [`GeoEstimator`]; the rest are dropped
//! without comment. Composed batches get their own TTL cache and coalescer.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use dx_core::cache::{Lookup, TtlCache};
use dx_core::coalesce::{CoalescerStats, SingleFlight};
use dx_core::config::PathsConfig;
use dx_core::geo::GeoEstimator;
use dx_core::{DxPath, LatLon, Spot};
use tracing::{debug, info};

use crate::cached::CachedSource;

/// Shared, immutable path batch.
pub type PathBatch = Arc<Vec<DxPath>>;

pub struct PathComposer {
    spots: Arc<CachedSource>,
    geo: Arc<GeoEstimator>,
    cache: Arc<TtlCache<(), PathBatch>>,
    flight: SingleFlight<Option<PathBatch>>,
    config: PathsConfig,
    deadline: Duration,
}

impl PathComposer {
    pub fn new(spots: Arc<CachedSource>, geo: Arc<GeoEstimator>, config: PathsConfig, deadline: Duration) -> Self {
        Self {
            spots,
            geo,
            cache: Arc::new(TtlCache::new("paths", config.cache_ttl())),
            flight: SingleFlight::new("paths"),
            config,
            deadline,
        }
    }

    /// Current paths, never failing; stale paths are served when a refresh
    /// produces nothing.
    pub async fn get_paths(&self) -> PathBatch {
        let stale = match self.cache.lookup(&()).await {
            Lookup::Fresh(batch) => return batch,
            Lookup::Stale(batch) => Some(batch),
            Lookup::Missing => None,
        };

        let spots = Arc::clone(&self.spots);
        let geo = Arc::clone(&self.geo);
        let cache = Arc::clone(&self.cache);
        let config = self.config.clone();
        let (flight, _) = self.flight.join_or_start(move || async move {
            let batch = spots.get().await;
            if batch.is_empty() {
                info!("[paths] no spots upstream, keeping previous paths");
                return None;
            }
            let paths = Arc::new(compose(&batch, Utc::now(), &geo, &config));
            cache.set((), Arc::clone(&paths)).await;
            info!("[paths] composed {} path(s) from {} spot(s)", paths.len(), batch.len());
            Some(paths)
        });

        match tokio::time::timeout(self.deadline, flight).await {
            Ok(Some(Some(paths))) => paths,
            _ => {
                debug!("[paths] refresh unavailable, serving {}", if stale.is_some() { "stale" } else { "empty" });
                stale.unwrap_or_default()
            }
        }
    }

    pub fn stats(&self) -> CoalescerStats {
        self.flight.stats()
    }
}

/// Build paths from `spots` as observed at `now`.
///
/// Steps: keep the first `fetch_limit` spots, drop those observed before the
/// window (undated spots are kept), resolve at most `max_lookups` distinct
/// callsigns, emit spots with both endpoints resolved, cap at `max_paths`.
pub fn compose(spots: &[Spot], now: DateTime<Utc>, geo: &GeoEstimator, config: &PathsConfig) -> Vec<DxPath> {
    let cutoff = now - config.window();
    let recent: Vec<&Spot> =
        spots.iter().take(config.fetch_limit).filter(|s| s.observed_at.is_none_or(|t| t >= cutoff)).collect();

    let mut located: AHashMap<&str, Option<LatLon>> = AHashMap::new();
    for call in recent.iter().flat_map(|s| [s.spotter.as_str(), s.dx_call.as_str()]) {
        if located.len() >= config.max_lookups {
            break;
        }
        located.entry(call).or_insert_with(|| geo.locate(call));
    }

    let resolve = |call: &str| located.get(call).copied().flatten();
    recent
        .iter()
        .filter_map(|s| {
            Some(DxPath {
                spotter: s.spotter.clone(),
                spotter_loc: resolve(&s.spotter)?,
                dx: s.dx_call.clone(),
                dx_loc: resolve(&s.dx_call)?,
                freq_mhz: s.freq_mhz.clone(),
                comment: s.comment.clone(),
                time: s.time.clone(),
            })
        })
        .take(config.max_paths)
        .collect()
}

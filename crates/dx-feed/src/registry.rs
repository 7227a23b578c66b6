//! Composition root: every service the HTTP layer needs, built from config.

use std::sync::Arc;

use dx_core::coalesce::CoalescerStats;
use dx_core::config::AppConfig;
use dx_core::error::DxError;
use dx_core::geo::GeoEstimator;
use serde::Serialize;
use tracing::info;

use crate::SpotFetcher;
use crate::cached::CachedSource;
use crate::dxspider::DxSpiderClient;
use crate::hamqth::HamQthFetcher;
use crate::paths::PathComposer;
use crate::selector::SourceSelector;

/// Shared services behind the HTTP surface.
pub struct SpotServices {
    pub selector: SourceSelector,
    pub paths: PathComposer,
}

/// Coalescing counters for one refresh path, as reported by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStats {
    pub name: &'static str,
    #[serde(flatten)]
    pub stats: CoalescerStats,
    pub coalescing_ratio: f64,
}

impl SpotServices {
    /// Build the production fetchers from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, DxError> {
        let hamqth = Arc::new(HamQthFetcher::new(&config.hamqth)?);
        let dxspider = Arc::new(DxSpiderClient::new(&config.dxspider));
        info!(
            "[registry] hamqth={} dxspider nodes={:?}",
            config.hamqth.url,
            config.dxspider.nodes.iter().map(|n| n.addr()).collect::<Vec<_>>()
        );
        Ok(Self::from_fetchers(hamqth, dxspider, config))
    }

    /// Wire arbitrary fetchers with the cache/coalescing policy from `config`.
    pub fn from_fetchers(hamqth: Arc<dyn SpotFetcher>, dxspider: Arc<dyn SpotFetcher>, config: &AppConfig) -> Self {
        let deadline = config.http.request_deadline();
        let hamqth = Arc::new(CachedSource::new(hamqth, config.hamqth.cache_ttl(), deadline));
        let dxspider = Arc::new(CachedSource::new(dxspider, config.dxspider.cache_ttl(), deadline));

        let paths = PathComposer::new(
            Arc::clone(&hamqth),
            Arc::new(GeoEstimator::new()),
            config.paths.clone(),
            deadline,
        );
        Self { selector: SourceSelector::new([hamqth, dxspider]), paths }
    }

    /// Coalescing counters for every refresh path.
    pub fn refresh_stats(&self) -> Vec<RefreshStats> {
        self.selector
            .stats()
            .into_iter()
            .map(|(source, stats)| (source.id(), stats))
            .chain(std::iter::once(("paths", self.paths.stats())))
            .map(|(name, stats)| RefreshStats { name, stats, coalescing_ratio: stats.coalescing_ratio() })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockFetcher;
    use dx_core::{SourcePreference, SpotSource};

    #[tokio::test(start_paused = true)]
    async fn paths_read_hamqth_only() {
        let ham = Arc::new(MockFetcher::new(SpotSource::HamQth));
        let spider = Arc::new(MockFetcher::new(SpotSource::DxSpider).then_spots(&["JA1XYZ"]));
        let services = SpotServices::from_fetchers(ham.clone(), spider.clone(), &AppConfig::default());

        assert!(services.paths.get_paths().await.is_empty());
        assert_eq!(ham.calls(), 1);
        assert_eq!(spider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spots_and_paths_share_the_hamqth_cache() {
        let ham = Arc::new(MockFetcher::new(SpotSource::HamQth).then_spots(&["JA1XYZ"]));
        let spider = Arc::new(MockFetcher::new(SpotSource::DxSpider));
        let services = SpotServices::from_fetchers(ham.clone(), spider, &AppConfig::default());

        assert_eq!(services.selector.get_spots(SourcePreference::HamQth).await.len(), 1);
        assert_eq!(services.paths.get_paths().await.len(), 1);
        assert_eq!(ham.calls(), 1);

        let names: Vec<_> = services.refresh_stats().iter().map(|s| s.name).collect();
        assert_eq!(names, ["dxspider", "hamqth", "paths"]);
    }

    #[test]
    fn builds_from_default_config() {
        assert!(SpotServices::from_config(&AppConfig::default()).is_ok());
    }
}

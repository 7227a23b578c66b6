//! Source fallback chain.
//!
//! A [`SourcePreference`] maps to an ordered strategy list; sources are tried
//! in order until one yields a non-empty batch. The first non-empty batch
//! wins, so every spot returned carries one provenance.

use std::sync::Arc;

use ahash::AHashMap;
use dx_core::coalesce::CoalescerStats;
use dx_core::{SourcePreference, SpotSource};
use tracing::{debug, info};

use crate::cached::{CachedSource, SpotBatch};

pub struct SourceSelector {
    sources: AHashMap<SpotSource, Arc<CachedSource>>,
}

impl SourceSelector {
    pub fn new(sources: impl IntoIterator<Item = Arc<CachedSource>>) -> Self {
        Self { sources: sources.into_iter().map(|s| (s.source(), s)).collect() }
    }

    /// Spots for `preference`; empty when every strategy came back empty.
    ///
    /// Sources missing from this selector are skipped.
    pub async fn get_spots(&self, preference: SourcePreference) -> SpotBatch {
        for source in preference.strategy_order() {
            let Some(cached) = self.sources.get(source) else {
                debug!("[selector] {source} not configured, skipping");
                continue;
            };
            let batch = cached.get().await;
            if !batch.is_empty() {
                debug!("[selector] {preference}: {} spot(s) from {source}", batch.len());
                return batch;
            }
            info!("[selector] {preference}: {source} yielded nothing");
        }
        SpotBatch::default()
    }

    /// Per-source coalescing statistics.
    pub fn stats(&self) -> Vec<(SpotSource, CoalescerStats)> {
        let mut out: Vec<_> = self.sources.values().map(|s| (s.source(), s.stats())).collect();
        out.sort_by_key(|(source, _)| source.id());
        out
    }
}

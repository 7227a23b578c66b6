//! Refresh policy around one upstream: TTL cache, single-flight, stale-serving.
//!
//! ```text
//! get() ──► Fresh? ──yes──► cached payload
//!              │no
//!              ▼
//!        SingleFlight ──► spawned refresh ──► fetch ──ok, non-empty──► cache.set
//!              │
//!        await ≤ deadline ──ok──► new payload
//!              │timeout / failure
//!              ▼
//!        stale payload, else empty
//! ```
//!
//! This is where upstream errors stop: callers only ever see a list.

use std::sync::Arc;
use std::time::Duration;

use dx_core::cache::{Lookup, TtlCache};
use dx_core::coalesce::{CoalescerStats, FlightRole, SingleFlight};
use dx_core::error::DxError;
use dx_core::{Spot, SpotSource};
use tracing::{debug, info, warn};

use crate::SpotFetcher;

/// Shared, immutable spot batch.
pub type SpotBatch = Arc<Vec<Spot>>;

/// One upstream behind its own cache and coalescer.
pub struct CachedSource {
    source: SpotSource,
    fetcher: Arc<dyn SpotFetcher>,
    cache: Arc<TtlCache<SpotSource, SpotBatch>>,
    flight: SingleFlight<Option<SpotBatch>>,
    deadline: Duration,
}

impl CachedSource {
    /// `ttl` bounds freshness, `deadline` bounds how long a caller waits on a
    /// refresh before falling back to stale data.
    pub fn new(fetcher: Arc<dyn SpotFetcher>, ttl: Duration, deadline: Duration) -> Self {
        let source = fetcher.source();
        Self {
            source,
            fetcher,
            cache: Arc::new(TtlCache::new(source.id(), ttl)),
            flight: SingleFlight::new(source.id()),
            deadline,
        }
    }

    pub fn source(&self) -> SpotSource {
        self.source
    }

    /// Current spots for this upstream, never failing.
    ///
    /// Empty only when no refresh has ever succeeded and the current one
    /// failed or missed the deadline.
    pub async fn get(&self) -> SpotBatch {
        let stale = match self.cache.lookup(&self.source).await {
            Lookup::Fresh(batch) => {
                debug!("[cache:{}] fresh hit ({} spots)", self.source.id(), batch.len());
                return batch;
            }
            Lookup::Stale(batch) => Some(batch),
            Lookup::Missing => None,
        };

        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let (flight, role) = self.flight.join_or_start(move || refresh(fetcher, cache));
        if role == FlightRole::Follower {
            debug!("[cache:{}] waiting on in-flight refresh", self.source.id());
        }

        match tokio::time::timeout(self.deadline, flight).await {
            Ok(Some(Some(batch))) => batch,
            Ok(_) => self.fallback(stale, "refresh failed"),
            Err(_) => self.fallback(stale, "deadline exceeded"),
        }
    }

    /// Last successful payload without triggering a refresh.
    #[cfg(test)]
    async fn peek(&self) -> Option<SpotBatch> {
        self.cache.get(&self.source).await
    }

    pub fn stats(&self) -> CoalescerStats {
        self.flight.stats()
    }

    fn fallback(&self, stale: Option<SpotBatch>, why: &str) -> SpotBatch {
        match stale {
            Some(batch) => {
                info!("[cache:{}] {why}, serving {} stale spot(s)", self.source.id(), batch.len());
                batch
            }
            None => {
                info!("[cache:{}] {why}, nothing cached", self.source.id());
                SpotBatch::default()
            }
        }
    }
}

/// Fetch once; store only a non-empty success, stamped at completion.
///
/// A flight that starts after another one already refreshed the entry
/// serves that entry instead of going upstream again.
async fn refresh(fetcher: Arc<dyn SpotFetcher>, cache: Arc<TtlCache<SpotSource, SpotBatch>>) -> Option<SpotBatch> {
    let source = fetcher.source();
    if let Lookup::Fresh(batch) = cache.lookup(&source).await {
        debug!("[cache:{}] refreshed by an earlier flight", source.id());
        return Some(batch);
    }
    let result = match fetcher.fetch().await {
        Ok(spots) if spots.is_empty() => Err(DxError::Empty),
        other => other,
    };
    match result {
        Ok(spots) => {
            let batch = Arc::new(spots);
            cache.set(source, Arc::clone(&batch)).await;
            info!("[cache:{}] refreshed with {} spot(s)", source.id(), batch.len());
            Some(batch)
        }
        Err(e) => {
            warn!("[cache:{}] refresh failed: {e}", source.id());
            None
        }
    }
}

//! # dx-feed
//!
//! Spot acquisition from heterogeneous upstreams.
//!
//! ## Architecture
//!
//! Each upstream implements [`SpotFetcher`]. Fetchers are wrapped in a
//! [`cached::CachedSource`] (TTL cache + single-flight refresh), and the
//! [`selector::SourceSelector`] walks an ordered strategy list of cached
//! sources until one yields spots.
//!
//! ```text
//! HamQthFetcher ──► CachedSource(30s) ──┬──► SourceSelector ──► /spots
//!                                       └──► PathComposer(30s) ──► /spots/paths
//! DxSpiderClient ─► CachedSource(60s) ──┘
//! ```
//!
//! ## Modules
//!
//! - [`hamqth`]: HTTP/CSV bulk fetch
//! - [`dxspider`]: telnet-style cluster session
//! - [`line_util`]: shared normalization helpers
//! - [`cached`]: refresh policy with stale-serving
//! - [`selector`]: source fallback chain
//! - [`paths`]: spotter → DX path composition
//! - [`registry`]: composition root built from config

pub mod cached;
pub mod dxspider;
pub mod hamqth;
pub mod line_util;
pub mod paths;
pub mod registry;
pub mod selector;

use async_trait::async_trait;
use dx_core::{Spot, SpotSource, error::DxError};

/// Trait implemented by every upstream spot source.
///
/// A successful fetch may legitimately return fewer records than asked for;
/// the caching layer treats an empty vector as a failed refresh.
#[async_trait]
pub trait SpotFetcher: Send + Sync {
    /// Provenance stamped on every spot this fetcher produces.
    fn source(&self) -> SpotSource;

    /// Fetch a fresh batch from upstream.
    async fn fetch(&self) -> Result<Vec<Spot>, DxError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Spot with fixed frequency/time; `observed_at` left unset.
    pub fn spot(spotter: &str, dx_call: &str, source: SpotSource) -> Spot {
        Spot {
            spotter: spotter.into(),
            dx_call: dx_call.into(),
            freq_mhz: "14.074".into(),
            comment: "FT8".into(),
            time: "14:23z".into(),
            source,
            observed_at: None,
        }
    }

    /// Scripted fetcher: replays queued results, then fails with `Empty`.
    pub struct MockFetcher {
        source: SpotSource,
        script: Mutex<VecDeque<Result<Vec<Spot>, DxError>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        pub fn new(source: SpotSource) -> Self {
            Self { source, script: Mutex::new(VecDeque::new()), delay: Duration::ZERO, calls: AtomicUsize::new(0) }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn then(self, result: Result<Vec<Spot>, DxError>) -> Self {
            self.script.lock().unwrap().push_back(result);
            self
        }

        pub fn then_spots(self, calls: &[&str]) -> Self {
            let source = self.source;
            self.then(Ok(calls.iter().map(|c| spot("G4ABC", c, source)).collect()))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpotFetcher for MockFetcher {
        fn source(&self) -> SpotSource {
            self.source
        }

        async fn fetch(&self) -> Result<Vec<Spot>, DxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script.lock().unwrap().pop_front().unwrap_or(Err(DxError::Empty))
        }
    }
}

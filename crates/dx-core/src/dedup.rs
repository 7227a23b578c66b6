//! Spot deduplication within a single acquisition session.
//!
//! A cluster node repeats the same sighting as several spotters report it, and
//! a `sh/dx` listing can overlap broadcast lines that arrived while it was
//! being produced. Only the *first* occurrence of each `(dx_call, freq_mhz)`
//! pair is kept. Dedup never spans sessions or upstream sources.

use ahash::AHashSet;

use crate::Spot;

/// Deduplicator keyed by `(dx_call, freq_mhz)`.
///
/// # Thread safety
///
/// Not thread-safe. Each session owns its own instance.
#[derive(Debug, Default)]
pub struct SpotDedup {
    seen: AHashSet<(String, String)>,
}

impl SpotDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `spot` is new for this session.
    ///
    /// Returns `true` if the pair has not been seen before, and records it.
    #[inline]
    pub fn check_and_insert(&mut self, spot: &Spot) -> bool {
        let (call, freq) = spot.dedup_key();
        self.seen.insert((call.to_owned(), freq.to_owned()))
    }
}

//! Single-flight refresh coalescing.
//!
//! When several callers find the same cache stale at once, only one upstream
//! refresh runs; every other caller awaits the same result.
//!
//! ```text
//! Caller A ─┐
//!           │                       spawned
//! Caller B ─┼──► SingleFlight ─────► refresh task ──► upstream
//!           │        │                    │
//! Caller C ─┘        ▼                    ▼
//!              [A, B, C await       [one session]
//!               one Shared future]
//! ```
//!
//! The refresh runs in its own task, so it finishes (and updates the cache)
//! even if every caller gave up at its own deadline. The in-flight slot is
//! cleared by that task when it completes.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use tracing::debug;

/// A refresh shared between all coalesced callers.
///
/// Resolves to `None` only if the refresh task panicked.
pub type SharedFlight<T> = Shared<BoxFuture<'static, Option<T>>>;

type Slot<T> = Arc<Mutex<Option<(u64, SharedFlight<T>)>>>;

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CoalescerStats {
    /// Total refresh requests received.
    pub total_requests: u64,
    /// Requests that joined an in-flight refresh.
    pub coalesced_requests: u64,
    /// Requests that started a new refresh.
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Returns the coalescing ratio (0.0 to 1.0).
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 { 0.0 } else { self.coalesced_requests as f64 / self.total_requests as f64 }
    }
}

/// Whether the caller started the refresh or joined one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    Leader,
    Follower,
}

/// At most one in-flight refresh per instance.
pub struct SingleFlight<T: Clone> {
    name: String,
    slot: Slot<T>,
    next_id: AtomicU64,
    total_requests: AtomicU64,
    coalesced_requests: AtomicU64,
    new_requests: AtomicU64,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            new_requests: AtomicU64::new(0),
        }
    }

    /// Join the in-flight refresh, or spawn `start()` as a new one.
    ///
    /// `start` is only invoked when no refresh is in flight. Must be called
    /// from within a tokio runtime.
    pub fn join_or_start<F, Fut>(&self, start: F) -> (SharedFlight<T>, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, flight)) = slot.as_ref() {
            self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
            debug!("[coalesce:{}] joining in-flight refresh", self.name);
            return (flight.clone(), FlightRole::Follower);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let refresh = start();
        let task_slot = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            let out = refresh.await;
            let mut slot = task_slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|(current, _)| *current == id) {
                *slot = None;
            }
            out
        });

        let flight: SharedFlight<T> = async move { handle.await.ok() }.boxed().shared();
        *slot = Some((id, flight.clone()));
        self.new_requests.fetch_add(1, Ordering::Relaxed);
        debug!("[coalesce:{}] started refresh #{id}", self.name);
        (flight, FlightRole::Leader)
    }

    /// `true` while a refresh is running.
    pub fn in_flight(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            new_requests: self.new_requests.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let sf = SingleFlight::<u32>::new("test");
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let r = Arc::clone(&runs);
        let (a, role_a) = sf.join_or_start(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
            let _ = rx.await;
            7
        });
        let r = Arc::clone(&runs);
        let (b, role_b) = sf.join_or_start(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
            8
        });

        assert_eq!(role_a, FlightRole::Leader);
        assert_eq!(role_b, FlightRole::Follower);
        tx.send(()).unwrap();
        assert_eq!(a.await, Some(7));
        assert_eq!(b.await, Some(7));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let stats = sf.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.coalesced_requests, 1);
        assert!((stats.coalescing_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn slot_clears_after_completion() {
        let sf = SingleFlight::<u32>::new("test");
        let (first, _) = sf.join_or_start(|| async { 1 });
        assert_eq!(first.await, Some(1));

        // The spawned task clears the slot right after producing its value.
        for _ in 0..50 {
            if !sf.in_flight() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(!sf.in_flight());

        let (second, role) = sf.join_or_start(|| async { 2 });
        assert_eq!(role, FlightRole::Leader);
        assert_eq!(second.await, Some(2));
    }

    #[tokio::test]
    async fn refresh_outlives_abandoning_caller() {
        let sf = SingleFlight::<u32>::new("test");
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        let (flight, _) = sf.join_or_start(move || async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            d.fetch_add(1, Ordering::SeqCst);
            3
        });

        assert!(tokio::time::timeout(Duration::from_millis(1), flight).await.is_err());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}

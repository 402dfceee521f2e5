//! Serial request queue for a single provider.
//!
//! Every outbound request of a client goes through one queue. Requests run
//! one at a time in arrival order, and each one starts no sooner than the
//! configured minimum interval after the previous one finished. This gives a
//! hard per-client rate ceiling without any bookkeeping at call sites.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use log::debug;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::models::ProviderId;
use crate::provider::RateLimit;

/// FIFO, single-worker request queue with a minimum inter-request delay.
///
/// Fairness comes from `tokio::sync::Mutex`, which hands the lock to waiters
/// in the order they asked for it.
pub struct RequestQueue {
    /// Name used in log lines.
    name: ProviderId,
    /// Minimum spacing in milliseconds. Atomic so a plan change can retune it.
    min_interval_ms: AtomicU64,
    /// Requests waiting for or holding the slot.
    depth: AtomicUsize,
    /// Completion time of the previous request.
    slot: Mutex<Option<Instant>>,
}

impl RequestQueue {
    /// Create a queue paced by a rate limit.
    pub fn new(name: impl Into<ProviderId>, rate_limit: &RateLimit) -> Self {
        Self {
            name: name.into(),
            min_interval_ms: AtomicU64::new(rate_limit.min_delay.as_millis() as u64),
            depth: AtomicUsize::new(0),
            slot: Mutex::new(None),
        }
    }

    /// Current minimum spacing between requests.
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms.load(Ordering::Relaxed))
    }

    /// Change the pacing, e.g. after the effective plan changed.
    pub fn set_rate_limit(&self, rate_limit: &RateLimit) {
        self.min_interval_ms
            .store(rate_limit.min_delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of requests queued or running.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Run `op` once every earlier request has finished and the pacing delay
    /// has elapsed.
    ///
    /// A dropped call gives back its depth count. A request cut off
    /// mid-flight still counts as finished for pacing.
    pub async fn run<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _queued = Queued::enter(&self.depth);
        let last_finished = self.slot.lock().await;

        if let Some(finished) = *last_finished {
            let interval = self.min_interval();
            let elapsed = finished.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(
                    "Request queue '{}': waiting {:?} ({} queued)",
                    self.name,
                    wait,
                    self.depth()
                );
                tokio::time::sleep(wait).await;
            }
        }

        let _running = Running(last_finished);
        op().await
    }
}

/// Holds one unit of queue depth until dropped.
struct Queued<'a>(&'a AtomicUsize);

impl<'a> Queued<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::Relaxed);
        Self(depth)
    }
}

impl Drop for Queued<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// The held slot; records the completion time when released.
struct Running<'a>(MutexGuard<'a, Option<Instant>>);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        *self.0 = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced_by_min_interval() {
        let queue = RequestQueue::new("TEST", &RateLimit::per_minute(60));
        let mut starts = Vec::new();

        for _ in 0..3 {
            let started = queue.run(|| async { Instant::now() }).await;
            starts.push(started);
        }

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_not_delayed() {
        let queue = RequestQueue::new("TEST", &RateLimit::per_minute(1));
        let before = Instant::now();
        queue.run(|| async {}).await;
        assert_eq!(Instant::now() - before, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_counts_from_completion() {
        let queue = RequestQueue::new("TEST", &RateLimit::per_minute(60));

        let first_done = queue
            .run(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Instant::now()
            })
            .await;
        let second_start = queue.run(|| async { Instant::now() }).await;

        assert!(second_start - first_done >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_run_in_order_without_overlap() {
        let queue = Arc::new(RequestQueue::new("TEST", &RateLimit::per_minute(600)));
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let queue = queue.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .run(|| async {
                        log.lock().unwrap().push((i, Instant::now()));
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    })
                    .await;
            }));
            // Make the enqueue order deterministic.
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let log = log.lock().unwrap();
        let order: Vec<_> = log.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        for pair in log.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(110));
        }
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_request_releases_queue() {
        let queue = RequestQueue::new("TEST", &RateLimit::per_minute(60));

        let cut_off = tokio::time::timeout(
            Duration::from_millis(100),
            queue.run(|| tokio::time::sleep(Duration::from_secs(10))),
        )
        .await;
        assert!(cut_off.is_err());
        assert_eq!(queue.depth(), 0);
        let cut_off_at = Instant::now();

        // Dropped while waiting for its turn: the op never runs.
        let ran = std::sync::atomic::AtomicBool::new(false);
        let waiting = tokio::time::timeout(
            Duration::from_millis(10),
            queue.run(|| async { ran.store(true, Ordering::Relaxed) }),
        )
        .await;
        assert!(waiting.is_err());
        assert!(!ran.load(Ordering::Relaxed));
        assert_eq!(queue.depth(), 0);

        // The cut-off request still paces the next one.
        let started = queue.run(|| async { Instant::now() }).await;
        assert!(started - cut_off_at >= Duration::from_secs(1));
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retuning_rate_limit() {
        let queue = RequestQueue::new("TEST", &RateLimit::per_minute(60));
        queue.set_rate_limit(&RateLimit::per_minute(600));
        assert_eq!(queue.min_interval(), Duration::from_millis(100));

        queue.run(|| async {}).await;
        let before = Instant::now();
        queue.run(|| async {}).await;
        assert!(Instant::now() - before >= Duration::from_millis(100));
    }
}

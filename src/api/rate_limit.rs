use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use crate::observability::metrics::RATE_LIMIT_TRACKED_CLIENTS;

/// Per-client sliding-log rate limiter.
///
/// Each client id maps to the timestamps of its requests inside the trailing
/// window. The map is sharded, so an admission for one client only locks the
/// shard holding that client and the filter+append+count sequence is atomic
/// per key.
///
/// A caller is rejected once more than `max_requests` requests (rejected ones
/// included) fall inside the window. Only the newest `max_requests + 1`
/// timestamps can affect that decision, so older ones are dropped on insert.
pub struct RateLimiter {
    hits: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        RateLimiter {
            hits: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Records a request for `client_id` and returns `true` when it must be
    /// rejected.
    pub fn is_rate_limited(&self, client_id: &str) -> bool {
        let mut hits = self.hits.entry(client_id.to_string()).or_default();
        // Read the clock under the shard lock so each log stays in time order
        let now = Instant::now();
        self.record(&mut hits, now)
    }

    pub fn check(&self, client_id: &str) -> Result<()> {
        if self.is_rate_limited(client_id) {
            return Err(Error::RateLimitExceeded);
        }
        Ok(())
    }

    pub(crate) fn is_rate_limited_at(&self, client_id: &str, now: Instant) -> bool {
        let mut hits = self.hits.entry(client_id.to_string()).or_default();
        self.record(&mut hits, now)
    }

    fn record(&self, hits: &mut VecDeque<Instant>, now: Instant) -> bool {
        // Remove old timestamps
        self.purge(hits, now);

        // Record new timestamp
        hits.push_back(now);
        while hits.len() > self.max_requests + 1 {
            hits.pop_front();
        }

        hits.len() > self.max_requests
    }

    /// Drops expired timestamps everywhere and evicts clients left with none.
    /// Returns the number of evicted clients.
    pub fn compact(&self) -> usize {
        self.compact_at(Instant::now())
    }

    pub(crate) fn compact_at(&self, now: Instant) -> usize {
        let mut evicted = 0;
        self.hits.retain(|_, hits| {
            self.purge(hits, now);
            if hits.is_empty() {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }

    /// Background compaction loop. Returns once `shutdown` observes `true`
    /// or its sender is dropped.
    pub async fn run_compaction(self: Arc<Self>, every: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = every.as_millis() as u64, "Rate limit compaction started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.compact();
                    let tracked = self.tracked_clients();
                    RATE_LIMIT_TRACKED_CLIENTS.set(tracked as i64);
                    tracing::debug!(evicted, tracked, "Rate limit compaction pass");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Rate limit compaction stopped");
    }

    fn purge(&self, hits: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = hits.front() {
            if now.saturating_duration_since(front) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WINDOW: Duration = Duration::from_millis(60_000);

    #[test]
    fn allows_up_to_quota_then_rejects() {
        let limiter = RateLimiter::new(30, WINDOW);
        let start = Instant::now();

        for i in 0..30 {
            assert!(!limiter.is_rate_limited_at("10.0.0.1", start + Duration::from_millis(i * 100)));
        }
        assert!(limiter.is_rate_limited_at("10.0.0.1", start + Duration::from_secs(10)));
    }

    #[test]
    fn clients_are_counted_independently() {
        let limiter = RateLimiter::new(2, WINDOW);
        let now = Instant::now();

        assert!(!limiter.is_rate_limited_at("a", now));
        assert!(!limiter.is_rate_limited_at("a", now));
        assert!(limiter.is_rate_limited_at("a", now));
        assert!(!limiter.is_rate_limited_at("b", now));
    }

    #[test]
    fn window_resets_after_silence() {
        let limiter = RateLimiter::new(3, WINDOW);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.is_rate_limited_at("a", start);
        }
        assert!(limiter.is_rate_limited_at("a", start + Duration::from_secs(1)));

        let later = start + Duration::from_secs(1) + WINDOW;
        assert!(!limiter.is_rate_limited_at("a", later));
    }

    #[test]
    fn log_slides_rather_than_resetting_at_boundary() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();

        assert!(!limiter.is_rate_limited_at("a", start));
        assert!(!limiter.is_rate_limited_at("a", start + Duration::from_secs(30)));
        // first hit expired, second still live
        assert!(!limiter.is_rate_limited_at("a", start + Duration::from_secs(61)));
        assert!(limiter.is_rate_limited_at("a", start + Duration::from_secs(62)));
    }

    #[test]
    fn check_maps_rejection_to_error() {
        let limiter = RateLimiter::new(1, WINDOW);

        assert!(limiter.check("unknown").is_ok());
        assert!(matches!(limiter.check("unknown"), Err(Error::RateLimitExceeded)));
    }

    #[test]
    fn stored_log_is_bounded() {
        let limiter = RateLimiter::new(3, WINDOW);
        let now = Instant::now();

        for _ in 0..1_000 {
            limiter.is_rate_limited_at("flood", now);
        }
        assert_eq!(limiter.hits.get("flood").map(|h| h.len()), Some(4));
    }

    #[test]
    fn compaction_evicts_only_fully_expired_clients() {
        let limiter = RateLimiter::new(5, WINDOW);
        let start = Instant::now();

        limiter.is_rate_limited_at("stale", start);
        limiter.is_rate_limited_at("mixed", start);
        limiter.is_rate_limited_at("mixed", start + Duration::from_secs(50));

        let evicted = limiter.compact_at(start + WINDOW + Duration::from_secs(1));

        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.hits.get("stale").is_none());
        assert_eq!(limiter.hits.get("mixed").map(|h| h.len()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn background_compaction_evicts_idle_clients() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(1)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        limiter.is_rate_limited("idle");
        let task = tokio::spawn(Arc::clone(&limiter).run_compaction(Duration::from_secs(5), shutdown_rx));

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(limiter.tracked_clients(), 0);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn background_compaction_keeps_live_clients() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(10)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(Arc::clone(&limiter).run_compaction(Duration::from_secs(5), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(3)).await;
        limiter.is_rate_limited("active");
        tokio::time::sleep(Duration::from_millis(2_100)).await;

        assert_eq!(limiter.tracked_clients(), 1);

        drop(shutdown_tx);
        task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_admissions_for_one_client_never_undercount() {
        let limiter = Arc::new(RateLimiter::new(30, WINDOW));

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { !limiter.is_rate_limited("shared") })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 30);

        let hits = limiter.hits.get("shared").unwrap();
        assert!(hits.iter().zip(hits.iter().skip(1)).all(|(a, b)| a <= b));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn contended_log_stays_in_time_order() {
        let limiter = Arc::new(RateLimiter::new(10_000, WINDOW));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    for _ in 0..500 {
                        limiter.is_rate_limited("hot");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let hits = limiter.hits.get("hot").unwrap();
        assert_eq!(hits.len(), 4_000);
        assert!(hits.iter().zip(hits.iter().skip(1)).all(|(a, b)| a <= b));
    }

    proptest! {
        #[test]
        fn exactly_quota_requests_fit_in_a_window(max in 1usize..60, spacing_ms in 0u64..500) {
            let window = Duration::from_millis(60_000);
            let limiter = RateLimiter::new(max, window);
            let start = Instant::now();
            let spacing = Duration::from_millis(spacing_ms.min(59_000 / max as u64));

            for i in 0..max {
                prop_assert!(!limiter.is_rate_limited_at("p", start + spacing * i as u32));
            }
            prop_assert!(limiter.is_rate_limited_at("p", start + spacing * max as u32));
            prop_assert!(!limiter.is_rate_limited_at("p", start + spacing * max as u32 + window));
        }
    }
}

//! Per-endpoint upstream cooldown and short-window result echo.
//!
//! Independent of the cache: even when a cache entry has legitimately
//! expired, the same upstream endpoint is not called more often than once
//! per `min_interval`. The interval is enforced with a keyed `governor`
//! limiter whose quota replenishes one call per interval. The limiter reads
//! tokio's clock, so paused-time tests drive it like everything else.
//!
//! The echo store remembers the last raw result per request (endpoint plus
//! the exact upstream window). A repeat of the same request inside
//! `echo_window` is answered from it without touching the cache or the
//! upstream client. While the endpoint is cooling down, a result recorded
//! within the last `min_interval` may still be served; anything older is not.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// governor clock backed by `tokio::time`, so it honours paused time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        Instant::now().into_std()
    }
}

type EndpointLimiter = RateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    TokioClock,
    NoOpMiddleware<std::time::Instant>,
>;

/// A remembered upstream result and when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<V> {
    pub value: V,
    pub recorded_at: Instant,
}

/// Minimum-interval guard per endpoint plus the per-request echo store.
pub struct CooldownTracker<V> {
    limiter: EndpointLimiter,
    clock: TokioClock,
    min_interval: Duration,
    echo_window: Duration,
    last_results: Mutex<HashMap<String, Recorded<V>>>,
}

impl<V: Clone> CooldownTracker<V> {
    /// Tracker allowing one call per endpoint every `min_interval`.
    pub fn new(min_interval: Duration, echo_window: Duration) -> Self {
        let quota = Quota::with_period(min_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));

        Self {
            limiter: RateLimiter::new(quota, DefaultKeyedStateStore::default(), TokioClock),
            clock: TokioClock,
            min_interval,
            echo_window,
            last_results: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when the caller should back off from `endpoint`.
    ///
    /// A call that is allowed is recorded, so the next call to the same
    /// endpoint within the interval is limited.
    pub fn should_rate_limit(&self, endpoint: &str) -> bool {
        self.check(endpoint).is_err()
    }

    /// Like [`should_rate_limit`](Self::should_rate_limit) but reports how
    /// long until the endpoint may be called again.
    pub fn check(&self, endpoint: &str) -> Result<(), Duration> {
        self.limiter
            .check_key(&endpoint.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Configured minimum interval between calls to one endpoint.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Result for `request` if it was recorded within the echo window.
    pub async fn echo(&self, request: &str) -> Option<Recorded<V>> {
        self.recorded_within(request, self.echo_window).await
    }

    /// Result for `request` if it was recorded within the cooldown interval.
    ///
    /// Older results are never served, even while the endpoint is limited.
    pub async fn last_known(&self, request: &str) -> Option<Recorded<V>> {
        self.recorded_within(request, self.min_interval).await
    }

    /// Remember `value` as the latest result for `request`; returns the
    /// instant it was recorded at.
    pub async fn record(&self, request: &str, value: V) -> Instant {
        let recorded_at = Instant::now();
        let mut results = self.last_results.lock().await;
        results.insert(request.to_string(), Recorded { value, recorded_at });
        recorded_at
    }

    /// Forget every remembered result.
    pub async fn clear(&self) {
        self.last_results.lock().await.clear();
    }

    async fn recorded_within(&self, request: &str, window: Duration) -> Option<Recorded<V>> {
        let results = self.last_results.lock().await;
        results
            .get(request)
            .filter(|entry| entry.recorded_at.elapsed() <= window)
            .cloned()
    }
}

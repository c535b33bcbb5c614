//! Rate Limiting Infrastructure
//!
//! Per-client sliding-window admission control.
//!
//! Every client key owns a queue of the instants at which its admitted
//! requests arrived. A request is admitted when fewer than `max_requests`
//! of those instants lie inside the trailing `window`. The queue for a key is
//! only ever touched while holding that key's map entry, so the
//! prune-check-append sequence is atomic per client while unrelated clients
//! land on other shards and never wait on each other.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests admitted in any trailing window. `0` disables limiting.
    pub max_requests: u32,
    /// Length of the trailing window
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0 && !self.window.is_zero()
    }
}

/// Outcome of an admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted; `remaining` more would be admitted right now.
    Allow { remaining: u32 },
    /// Window is full; the oldest admitted request leaves it after `retry_after`.
    Deny { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow { .. })
    }
}

/// Sliding-window limiter keyed by client identity.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone)]
pub struct SlidingWindowLimiter {
    inner: Arc<LimiterInner>,
}

#[derive(Debug)]
struct LimiterInner {
    config: RateLimitConfig,
    windows: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                config,
                windows: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.inner.config
    }

    /// Decide whether the request from `client_key` arriving at `now` is admitted.
    ///
    /// Timestamps at or before `now - window` are dropped first. A denied
    /// request leaves no trace in the window.
    pub fn admit(&self, client_key: &str, now: Instant) -> Admission {
        let config = &self.inner.config;
        if !config.is_enabled() {
            return Admission::Allow {
                remaining: u32::MAX,
            };
        }

        let limit = config.max_requests as usize;

        // Avoid allocating a key String on the hot path for known clients.
        let mut timestamps = match self.inner.windows.get_mut(client_key) {
            Some(entry) => entry,
            None => self
                .inner
                .windows
                .entry(client_key.to_owned())
                .or_default(),
        };

        if let Some(cutoff) = now.checked_sub(config.window) {
            while timestamps.front().is_some_and(|t| *t <= cutoff) {
                timestamps.pop_front();
            }
        }

        if timestamps.len() >= limit {
            let retry_after = timestamps
                .front()
                .map(|oldest| (*oldest + config.window).saturating_duration_since(now))
                .unwrap_or(config.window);

            tracing::debug!(
                client_key = %client_key,
                in_window = timestamps.len(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Admission denied"
            );

            return Admission::Deny { retry_after };
        }

        timestamps.push_back(now);
        Admission::Allow {
            remaining: (limit - timestamps.len()) as u32,
        }
    }

    /// `admit` against the current instant
    pub fn check(&self, client_key: &str) -> Admission {
        self.admit(client_key, Instant::now())
    }

    /// Drop every client whose whole history has aged out of the window.
    ///
    /// Returns the number of clients removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let Some(cutoff) = now.checked_sub(self.inner.config.window) else {
            return 0;
        };

        let before = self.inner.windows.len();
        self.inner
            .windows
            .retain(|_, timestamps| timestamps.back().is_some_and(|t| *t > cutoff));
        before.saturating_sub(self.inner.windows.len())
    }

    /// Number of clients currently holding window state
    pub fn tracked_clients(&self) -> usize {
        self.inner.windows.len()
    }
}

/// Periodically evict idle clients so the map is bounded by the active set.
pub fn spawn_sweeper(limiter: SlidingWindowLimiter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.sweep(Instant::now());
            if removed > 0 {
                tracing::debug!(
                    removed = removed,
                    tracked = limiter.tracked_clients(),
                    "Swept idle rate limit windows"
                );
            }
        }
    })
}

//! Per-id sliding window rate limiter
//!
//! Guards the upstream provider from being hammered for the same media id.
//! Each id keeps the timestamps of its admitted requests inside the trailing
//! window; a request is admitted while fewer than `max_requests` remain.
//!
//! The set of tracked ids is bounded: the map is an LRU cache, so once
//! `max_tracked_ids` is reached the least recently requested id is dropped.
//! [`RateLimiter::sweep`] additionally removes ids whose windows have fully
//! expired and is run periodically by the server.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

use crate::config::RateLimitConfig;

/// Limiter parameters
#[derive(Debug, Clone, Copy)]
pub struct LimiterSettings {
    pub max_requests: usize,
    pub window_ms: u64,
    pub max_tracked_ids: usize,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60_000,
            max_tracked_ids: 10_000,
        }
    }
}

impl From<&RateLimitConfig> for LimiterSettings {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window_ms: config.window.as_millis(),
            max_tracked_ids: config.max_tracked_ids,
        }
    }
}

/// Sliding window limiter keyed by media id
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<LruCache<String, VecDeque<u64>>>,
    max_requests: usize,
    window_ms: u64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter reading the system clock
    pub fn new(settings: LimiterSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: LimiterSettings, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(settings.max_tracked_ids).unwrap_or(NonZeroUsize::MIN);
        Self {
            windows: Mutex::new(LruCache::new(capacity)),
            max_requests: settings.max_requests,
            window_ms: settings.window_ms,
            clock,
        }
    }

    /// Admit or reject one request for `id`
    ///
    /// Expired timestamps are dropped first. A rejected attempt is not
    /// recorded, so a client hammering a throttled id does not extend its
    /// own lockout.
    pub fn check_and_record(&self, id: &str) -> bool {
        let now = self.clock.now_ms();
        let window_ms = self.window_ms;
        let mut windows = self.windows.lock();

        if let Some(timestamps) = windows.get_mut(id) {
            timestamps.retain(|&t| now.saturating_sub(t) < window_ms);
            if timestamps.len() >= self.max_requests {
                return false;
            }
            timestamps.push_back(now);
            return true;
        }

        if self.max_requests == 0 {
            return false;
        }

        if let Some((evicted, _)) = windows.push(id.to_string(), VecDeque::from([now])) {
            if evicted != id {
                debug!(evicted = %evicted, "Rate window evicted at capacity");
            }
        }
        true
    }

    /// Number of requests for `id` still inside the window
    pub fn in_window(&self, id: &str) -> usize {
        let now = self.clock.now_ms();
        let windows = self.windows.lock();
        windows
            .peek(id)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .filter(|&&t| now.saturating_sub(t) < self.window_ms)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Drop ids with no timestamps left in the window; returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let window_ms = self.window_ms;
        let mut windows = self.windows.lock();

        let stale: Vec<String> = windows
            .iter()
            .filter(|(_, timestamps)| {
                timestamps.iter().all(|&t| now.saturating_sub(t) >= window_ms)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            windows.pop(id);
        }

        if !stale.is_empty() {
            debug!(removed = stale.len(), remaining = windows.len(), "Swept stale rate windows");
        }
        stale.len()
    }

    /// Number of ids currently tracked
    pub fn tracked_ids(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(settings: LimiterSettings) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let limiter = RateLimiter::with_clock(settings, clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let (limiter, clock) = limiter(LimiterSettings::default());

        for _ in 0..10 {
            assert!(limiter.check_and_record("photo-1"));
            clock.advance(Duration::from_secs(1));
        }
        assert!(!limiter.check_and_record("photo-1"));
        assert_eq!(limiter.in_window("photo-1"), 10);
    }

    #[test]
    fn test_ids_are_independent() {
        let (limiter, _clock) = limiter(LimiterSettings::default());

        for _ in 0..10 {
            assert!(limiter.check_and_record("a"));
        }
        assert!(!limiter.check_and_record("a"));
        assert!(limiter.check_and_record("b"));
    }

    #[test]
    fn test_window_slides() {
        let (limiter, clock) = limiter(LimiterSettings::default());

        assert!(limiter.check_and_record("photo"));
        clock.advance(Duration::from_secs(30));
        for _ in 0..9 {
            assert!(limiter.check_and_record("photo"));
        }
        assert!(!limiter.check_and_record("photo"));

        // The first request is exactly one window old and no longer counts
        clock.advance(Duration::from_secs(30));
        assert!(limiter.check_and_record("photo"));
        assert!(!limiter.check_and_record("photo"));
    }

    #[test]
    fn test_rejected_attempts_are_not_recorded() {
        let (limiter, clock) = limiter(LimiterSettings {
            max_requests: 2,
            ..LimiterSettings::default()
        });

        assert!(limiter.check_and_record("x"));
        assert!(limiter.check_and_record("x"));
        for _ in 0..5 {
            assert!(!limiter.check_and_record("x"));
        }
        assert_eq!(limiter.in_window("x"), 2);

        clock.advance(Duration::from_secs(60));
        assert!(limiter.check_and_record("x"));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let (limiter, _clock) = limiter(LimiterSettings {
            max_requests: 1,
            max_tracked_ids: 2,
            ..LimiterSettings::default()
        });

        assert!(limiter.check_and_record("a"));
        assert!(limiter.check_and_record("b"));
        // Touch "a" so "b" becomes least recently used
        assert!(!limiter.check_and_record("a"));
        assert!(limiter.check_and_record("c"));

        assert_eq!(limiter.tracked_ids(), 2);
        assert_eq!(limiter.in_window("b"), 0);
        // "a" kept its window, "b" starts fresh
        assert!(!limiter.check_and_record("a"));
        assert!(limiter.check_and_record("b"));
    }

    #[test]
    fn test_sweep_removes_expired_ids() {
        let (limiter, clock) = limiter(LimiterSettings::default());

        limiter.check_and_record("old");
        clock.advance(Duration::from_secs(45));
        limiter.check_and_record("fresh");
        clock.advance(Duration::from_secs(20));

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked_ids(), 1);
        assert_eq!(limiter.in_window("fresh"), 1);
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let (limiter, _clock) = limiter(LimiterSettings {
            max_requests: 0,
            ..LimiterSettings::default()
        });
        assert!(!limiter.check_and_record("any"));
        assert_eq!(limiter.tracked_ids(), 0);
    }

    #[test]
    fn test_settings_from_config() {
        let config = RateLimitConfig::default();
        let settings = LimiterSettings::from(&config);
        assert_eq!(settings.max_requests, 10);
        assert_eq!(settings.window_ms, 60_000);
        assert_eq!(settings.max_tracked_ids, 10_000);
    }
}

//! Token-bucket rate limiting for embedding requests (`spec.md` §4.5/§6).
//!
//! Replaces the teacher's semaphore-based concurrency bulkhead with a
//! refill-over-time token bucket, since the spec rate-limits *throughput*
//! (tokens per interval) rather than *concurrency* (max-in-flight).

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Configuration for the embedding token bucket.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    /// Tokens granted per refill interval. Default: 20.
    pub tokens_per_interval: u32,
    /// Refill interval in milliseconds. Default: 60000 (1 minute).
    pub interval_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { tokens_per_interval: 20, interval_ms: 60_000 }
    }
}

impl RateLimiterConfig {
    /// Applies environment variable overrides, matching the teacher's
    /// `CHRONOGRAPH_*`-prefixed override convention.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("CHRONOGRAPH_EMBEDDING_RATE_LIMIT_TOKENS")
            && let Ok(parsed) = v.parse::<u32>()
        {
            self.tokens_per_interval = parsed.max(1);
        }
        if let Ok(v) = std::env::var("CHRONOGRAPH_EMBEDDING_RATE_LIMIT_INTERVAL_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.interval_ms = parsed.max(1);
        }
        self
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket shared across embedding callers.
///
/// Tokens refill continuously at `tokens_per_interval / interval_ms` per
/// millisecond, capped at `tokens_per_interval` tokens outstanding, so a
/// caller that waits longer than one interval does not accumulate an
/// unbounded credit.
pub struct TokenBucket {
    config: RateLimiterConfig,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a bucket starting full.
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        let tokens = f64::from(config.tokens_per_interval);
        Self { config, state: Mutex::new(BucketState { tokens, last_refill: Instant::now() }) }
    }

    /// Attempts to withdraw one token, refilling first. Returns `true` if a
    /// token was available.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_n(1)
    }

    /// Attempts to withdraw `n` tokens atomically.
    #[must_use]
    pub fn try_acquire_n(&self, n: u32) -> bool {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.refill_locked(&mut state);
        let cost = f64::from(n);
        if state.tokens >= cost {
            state.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// The wait duration until at least one token would be available, or
    /// `Duration::ZERO` if one is available now.
    #[must_use]
    pub fn time_until_next_token(&self) -> Duration {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.refill_locked(&mut state);
        if state.tokens >= 1.0 {
            return Duration::ZERO;
        }
        let deficit = 1.0 - state.tokens;
        let ms_per_token = self.config.interval_ms as f64 / f64::from(self.config.tokens_per_interval);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let wait_ms = (deficit * ms_per_token).ceil() as u64;
        Duration::from_millis(wait_ms)
    }

    fn refill_locked(&self, state: &mut BucketState) {
        let elapsed = state.last_refill.elapsed();
        if elapsed.is_zero() {
            return;
        }
        let rate_per_ms = f64::from(self.config.tokens_per_interval) / self.config.interval_ms as f64;
        let refilled = elapsed.as_secs_f64() * 1000.0 * rate_per_ms;
        state.tokens = (state.tokens + refilled).min(f64::from(self.config.tokens_per_interval));
        state.last_refill = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_and_drains() {
        let bucket = TokenBucket::new(RateLimiterConfig { tokens_per_interval: 2, interval_ms: 60_000 });
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn refills_over_time() {
        let bucket = TokenBucket::new(RateLimiterConfig { tokens_per_interval: 1, interval_ms: 10 });
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
        std::thread::sleep(Duration::from_millis(15));
        assert!(bucket.try_acquire());
    }

    #[test]
    fn time_until_next_token_is_zero_when_available() {
        let bucket = TokenBucket::new(RateLimiterConfig::default());
        assert_eq!(bucket.time_until_next_token(), Duration::ZERO);
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("CHRONOGRAPH_EMBEDDING_RATE_LIMIT_TOKENS", "5");
        let config = RateLimiterConfig::default().with_env_overrides();
        assert_eq!(config.tokens_per_interval, 5);
        std::env::remove_var("CHRONOGRAPH_EMBEDDING_RATE_LIMIT_TOKENS");
    }
}

//! Token-bucket rate limiting keyed by credential
//!
//! Each credential talking to the remote CRM gets its own bucket so one
//! user exhausting their quota cannot starve another. Buckets refill on a
//! fixed interval and support bursts up to capacity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::{Clock, SystemClock};

/// Configuration for a token bucket.
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold
    pub capacity: u64,
    /// Tokens restored per refill interval
    pub refill_amount: u64,
    /// Interval between refills
    pub refill_interval: Duration,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        // Matches the remote CRM's documented burst allowance
        Self { capacity: 100, refill_amount: 10, refill_interval: Duration::from_secs(1) }
    }
}

impl TokenBucketConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".to_string());
        }
        if self.refill_amount == 0 {
            return Err("refill_amount must be greater than 0".to_string());
        }
        if self.refill_interval.is_zero() {
            return Err("refill_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Token bucket rate limiter.
///
/// Allows bursts up to capacity, then refills at a fixed rate. Cloning
/// shares the underlying bucket state.
pub struct TokenBucket<C: Clock = SystemClock> {
    config: TokenBucketConfig,
    tokens: Arc<AtomicU64>,
    last_refill: Arc<RwLock<Instant>>,
    clock: Arc<C>,
}

impl<C: Clock> TokenBucket<C> {
    /// Create a bucket with a custom clock (useful for tests).
    pub fn with_clock(config: TokenBucketConfig, clock: C) -> Result<Self, String> {
        config.validate()?;

        Ok(Self {
            tokens: Arc::new(AtomicU64::new(config.capacity)),
            last_refill: Arc::new(RwLock::new(clock.now())),
            clock: Arc::new(clock),
            config,
        })
    }

    fn refill(&self) {
        let now = self.clock.now();

        let last_refill = match self.last_refill.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn!("token bucket last_refill lock poisoned");
                *poisoned.into_inner()
            }
        };

        let elapsed = now.duration_since(last_refill);
        let refills = elapsed.as_millis() / self.config.refill_interval.as_millis();

        if refills > 0 {
            let tokens_to_add = (refills as u64).saturating_mul(self.config.refill_amount);
            let current = self.tokens.load(Ordering::Acquire);
            let new_tokens = current.saturating_add(tokens_to_add).min(self.config.capacity);

            self.tokens.store(new_tokens, Ordering::Release);

            if let Ok(mut guard) = self.last_refill.write() {
                *guard = now;
            }

            debug!(added = tokens_to_add, available = new_tokens, "refilled rate-limit tokens");
        }
    }

    /// Try to acquire one token; `false` means the caller is throttled.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_n(1)
    }

    /// Try to acquire `tokens` tokens atomically.
    pub fn try_acquire_n(&self, tokens: u64) -> bool {
        self.refill();

        let mut current = self.tokens.load(Ordering::Acquire);

        loop {
            if current < tokens {
                debug!(available = current, requested = tokens, "rate limit reached");
                return false;
            }

            match self.tokens.compare_exchange_weak(
                current,
                current - tokens,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Current number of available tokens.
    pub fn available_tokens(&self) -> u64 {
        self.refill();
        self.tokens.load(Ordering::Acquire)
    }
}

impl TokenBucket<SystemClock> {
    /// Create a bucket backed by the system clock.
    pub fn new(config: TokenBucketConfig) -> Result<Self, String> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Clone for TokenBucket<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            tokens: Arc::clone(&self.tokens),
            last_refill: Arc::clone(&self.last_refill),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Registry of token buckets keyed by an opaque credential key.
///
/// Injected into the CRM client so the shared limiter state is explicit
/// rather than a process-wide global, and can be swapped for an external
/// backend in multi-process deployments.
pub struct RateLimiterRegistry<C: Clock = SystemClock> {
    buckets: DashMap<String, TokenBucket<C>>,
    config: TokenBucketConfig,
    clock: C,
}

impl RateLimiterRegistry<SystemClock> {
    /// Registry with the default per-credential bucket configuration.
    pub fn new(config: TokenBucketConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock + Clone> RateLimiterRegistry<C> {
    /// Registry with a custom clock shared by every bucket.
    pub fn with_clock(config: TokenBucketConfig, clock: C) -> Self {
        Self { buckets: DashMap::new(), config, clock }
    }

    /// Acquire a token for the given credential key.
    ///
    /// Buckets are created lazily on first use. A validated default
    /// configuration cannot fail bucket construction, so a construction
    /// error falls back to allowing the call rather than wedging the sync.
    pub fn try_acquire(&self, key: &str) -> bool {
        if let Some(bucket) = self.buckets.get(key) {
            return bucket.try_acquire();
        }

        match TokenBucket::with_clock(self.config.clone(), self.clock.clone()) {
            Ok(bucket) => {
                let acquired = bucket.try_acquire();
                self.buckets.insert(key.to_string(), bucket);
                acquired
            }
            Err(err) => {
                warn!(error = %err, "failed to build rate-limit bucket; allowing call");
                true
            }
        }
    }

    /// Available tokens for a credential key, if a bucket exists yet.
    pub fn available_tokens(&self, key: &str) -> Option<u64> {
        self.buckets.get(key).map(|bucket| bucket.available_tokens())
    }
}

#[cfg(test)]
mod tests {
    use super::super::MockClock;
    use super::*;

    fn config(capacity: u64, refill: u64, interval_ms: u64) -> TokenBucketConfig {
        TokenBucketConfig {
            capacity,
            refill_amount: refill,
            refill_interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn bucket_allows_bursts_up_to_capacity() {
        let bucket = TokenBucket::new(config(3, 1, 1000)).unwrap();

        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn bucket_refills_over_time() {
        let clock = MockClock::new();
        let bucket = TokenBucket::with_clock(config(10, 5, 100), clock.clone()).unwrap();

        assert!(bucket.try_acquire_n(10));
        assert_eq!(bucket.available_tokens(), 0);

        clock.advance_millis(100);
        assert_eq!(bucket.available_tokens(), 5);

        clock.advance_millis(100);
        assert_eq!(bucket.available_tokens(), 10); // capped at capacity
    }

    #[test]
    fn config_validation_rejects_zeroes() {
        assert!(config(0, 1, 100).validate().is_err());
        assert!(config(1, 0, 100).validate().is_err());
        assert!(config(1, 1, 0).validate().is_err());
    }

    #[test]
    fn registry_keeps_credentials_independent() {
        let clock = MockClock::new();
        let registry = RateLimiterRegistry::with_clock(config(1, 1, 60_000), clock);

        assert!(registry.try_acquire("token-a"));
        assert!(!registry.try_acquire("token-a"));
        // A different credential has its own bucket
        assert!(registry.try_acquire("token-b"));
    }
}

//! Resilience primitives for talking to rate-limited remote services
//!
//! Provides a token-bucket rate limiter with a clock abstraction so
//! time-dependent behavior stays testable without real sleeps.

pub mod rate_limiter;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub use rate_limiter::{RateLimiterRegistry, TokenBucket, TokenBucketConfig};

/// Abstraction over monotonic and wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Real system clock for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Manually advanced clock for tests.
#[derive(Clone)]
pub struct MockClock {
    start: Instant,
    epoch: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a mock clock anchored at the current instant.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            epoch: SystemTime::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock without real delays.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    /// Convenience wrapper for [`MockClock::advance`].
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.epoch + self.elapsed()
    }
}

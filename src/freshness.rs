//! freshness.rs - seconds since the last good fetch
//!
//! the only staleness signal the session exposes. a growing value means the
//! poller keeps failing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free monotonic stopwatch.
///
/// Stores the last reset as an offset (in nanoseconds) from a fixed origin so
/// readers and the poller never contend on a lock.
pub struct FreshnessTimer {
    origin: Instant,
    last_reset_nanos: AtomicU64,
}

impl FreshnessTimer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_reset_nanos: AtomicU64::new(0),
        }
    }

    /// Mark "now" as the last successful fetch.
    pub fn reset(&self) {
        let nanos = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.last_reset_nanos.store(nanos, Ordering::Release);
    }

    pub fn elapsed(&self) -> Duration {
        let last = self.origin + Duration::from_nanos(self.last_reset_nanos.load(Ordering::Acquire));
        Instant::now().saturating_duration_since(last)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl Default for FreshnessTimer {
    fn default() -> Self {
        Self::new()
    }
}

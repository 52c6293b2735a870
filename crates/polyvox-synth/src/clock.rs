//! Wall-clock sources for envelope timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Seconds since an arbitrary, fixed origin.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

/// Monotonic system clock, zeroed at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock for offline rendering and tests.
///
/// Stored as whole nanoseconds so it can be shared without a lock.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `seconds`.
    pub fn set(&self, seconds: f64) {
        self.nanos.store(to_nanos(seconds), Ordering::Release);
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        self.nanos.fetch_add(to_nanos(seconds), Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.nanos.load(Ordering::Acquire) as f64 / 1e9
    }
}

fn to_nanos(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1e9).round() as u64
}

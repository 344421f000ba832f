//! Time abstraction for rollup and id generation
//!
//! All "now" lookups go through [`Clock`], so the same rollup logic runs against
//! the wall clock in production and against a hand-driven [`SimulatedClock`] in
//! tests, where period boundaries must be crossed on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamp in milliseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

/// Duration in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn from_millis(ms: u64) -> Self {
        Duration(ms)
    }

    pub fn from_secs(secs: u64) -> Self {
        Duration(secs * 1000)
    }

    pub fn from_hours(hours: u64) -> Self {
        Duration(hours * 3_600_000)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Duration(d.as_millis() as u64)
    }
}

/// Clock abstraction for time operations
pub trait Clock: Send + Sync {
    /// Get current time
    fn now(&self) -> Timestamp;
}

/// Shared clock handle held by metrics
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by `SystemTime`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // A clock set before 1970 reads as the epoch itself.
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(ms)
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now_ms: AtomicU64,
}

impl SimulatedClock {
    pub fn new(start: Timestamp) -> Self {
        SimulatedClock {
            now_ms: AtomicU64::new(start.0),
        }
    }

    /// Jump to an absolute time (may move backwards)
    pub fn set(&self, to: Timestamp) {
        self.now_ms.store(to.0, Ordering::SeqCst);
    }

    /// Move forward and return the new time
    pub fn advance(&self, by: Duration) -> Timestamp {
        let prev = self.now_ms.fetch_add(by.0, Ordering::SeqCst);
        Timestamp(prev.saturating_add(by.0))
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_ms.load(Ordering::SeqCst))
    }
}

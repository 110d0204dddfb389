//! Clock behind every delay the bridge takes.
//!
//! The bridge waits in four places: the reader's idle delay between polls,
//! the debounce before a flush drains the buffer, the bounded wait for a
//! process to exit on shutdown, and the grace period after teardown. All of
//! them go through [`TimeSource`] so the flush scheduler can be driven in unit
//! tests without real sleeping.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Where the bridge reads the time and sleeps.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;

    /// Block the calling thread. The reader thread and the host's tick both
    /// call this, so implementations must be usable from any thread.
    fn sleep(&self, duration: Duration);

    /// Time since `earlier`, zero if `earlier` lies in the future
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeSource;

impl RealTimeSource {
    pub fn shared() -> SharedTimeSource {
        Arc::new(Self)
    }
}

impl TimeSource for RealTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on or advanced by hand.
///
/// Every requested sleep is logged, so a test can check which delays the
/// scheduler asked for. Not for use with a live reader thread: polling a pipe
/// against this clock never actually waits.
#[derive(Debug)]
pub struct TestTimeSource {
    origin: Instant,
    inner: Mutex<ManualClock>,
}

#[derive(Debug, Default)]
struct ManualClock {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl Default for TestTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            inner: Mutex::new(ManualClock::default()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, ManualClock> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.clock().offset += duration;
    }

    /// Logical time since creation
    pub fn elapsed(&self) -> Duration {
        self.clock().offset
    }

    /// Sleeps requested so far, oldest first
    pub fn sleeps(&self) -> Vec<Duration> {
        self.clock().sleeps.clone()
    }
}

impl TimeSource for TestTimeSource {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        let mut clock = self.clock();
        clock.offset += duration;
        clock.sleeps.push(duration);
    }
}

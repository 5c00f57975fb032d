use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Trait for monotonic time sources.
///
/// `now` is measured from the timer's own origin. Clones share that origin, so
/// a reading taken on the input side can be compared with one taken by the
/// scheduler.
pub trait Timer: Clone + Send + Sync {
    fn now(&self) -> Duration;

    fn elapsed(&self, since: Duration) -> Duration {
        self.now().saturating_sub(since)
    }
}

/// Platform-backed monotonic timer.
///
/// Uses `std::time::Instant` by default. With the `high_precision_timer`
/// feature on Linux it reads `CLOCK_MONOTONIC_RAW`, which is not slewed by NTP.
#[derive(Debug, Clone, Copy)]
pub struct HighPrecisionTimer {
    origin: source::Origin,
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            origin: source::origin(),
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> Duration {
        source::since(&self.origin)
    }
}

#[cfg(all(target_os = "linux", feature = "high_precision_timer"))]
mod source {
    use std::time::Duration;

    pub type Origin = u64;

    pub fn origin() -> Origin {
        raw_nanos()
    }

    pub fn since(origin: &Origin) -> Duration {
        Duration::from_nanos(raw_nanos().saturating_sub(*origin))
    }

    fn raw_nanos() -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // CLOCK_MONOTONIC_RAW is always available on Linux >= 2.6.28.
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut ts);
        }
        ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
    }
}

#[cfg(not(all(target_os = "linux", feature = "high_precision_timer")))]
mod source {
    use std::time::{Duration, Instant};

    pub type Origin = Instant;

    pub fn origin() -> Origin {
        Instant::now()
    }

    pub fn since(origin: &Origin) -> Duration {
        origin.elapsed()
    }
}

/// Deterministic timer for tests and replays.
///
/// Every `now` returns the current value and then moves it forward by `step`,
/// so a polling loop always makes progress. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    nanos: Arc<AtomicU64>,
    step_ns: u64,
}

impl ManualTimer {
    /// A timer that only moves when told to.
    pub fn new() -> Self {
        Self::default()
    }

    /// A timer that advances by `step` on every read.
    pub fn with_step(step: Duration) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            step_ns: step.as_nanos() as u64,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Current reading without stepping.
    pub fn peek(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.fetch_add(self.step_ns, Ordering::SeqCst))
    }
}

use crate::Timer;
use std::time::Duration;

/// Resettable stopwatch over a [`Timer`].
///
/// Several clocks may share one timer (a global clock and a clock per phase);
/// resetting one never moves another.
#[derive(Debug, Clone)]
pub struct Clock<T: Timer> {
    timer: T,
    origin: Duration,
}

impl<T: Timer> Clock<T> {
    /// Starts at zero.
    pub fn new(timer: T) -> Self {
        let origin = timer.now();
        Self { timer, origin }
    }

    pub fn reset(&mut self) {
        self.origin = self.timer.now();
    }

    pub fn elapsed_duration(&self) -> Duration {
        self.timer.now().saturating_sub(self.origin)
    }

    /// Seconds since the last reset.
    pub fn elapsed(&self) -> f64 {
        self.elapsed_duration().as_secs_f64()
    }

    /// Converts a reading of the underlying timer into seconds since the last
    /// reset. Readings taken before the reset map to zero.
    pub fn at(&self, reading: Duration) -> f64 {
        reading.saturating_sub(self.origin).as_secs_f64()
    }

    /// A fresh clock on the same timer, starting now.
    pub fn fork(&self) -> Clock<T> {
        Clock::new(self.timer.clone())
    }
}

// Clock abstraction so readiness polling can be tested without sleeping
use std::time::{Duration, Instant};

/// Trait for abstracting time operations to enable testing
pub trait Clock: Send + Sync {
    /// Get the current instant
    fn now(&self) -> Instant;

    /// Sleep for the given duration
    fn sleep(&self, duration: Duration);
}

/// System clock implementation using real time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A point in time after which polling gives up
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn new(clock: &dyn Clock, timeout: Duration) -> Self {
        Self {
            started: clock.now(),
            timeout,
        }
    }

    pub fn elapsed(&self, clock: &dyn Clock) -> Duration {
        clock.now().saturating_duration_since(self.started)
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.elapsed(clock) >= self.timeout
    }

    /// Time left, never negative
    pub fn remaining(&self, clock: &dyn Clock) -> Duration {
        self.timeout.saturating_sub(self.elapsed(clock))
    }
}

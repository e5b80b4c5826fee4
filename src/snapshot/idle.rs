//! Idle strategies
//!
//! Used wherever the snapshot path waits: between offer retries and
//! between polls that delivered nothing.

use std::thread;
use std::time::Duration;

/// Wait policy for cooperative polling loops
pub trait IdleStrategy {
    /// Idle after a duty cycle that did `work_count` units of work.
    /// Work resets the backoff; no work advances it.
    fn idle_with(&mut self, work_count: usize) {
        if work_count > 0 {
            self.reset();
        } else {
            self.idle();
        }
    }

    /// Idle unconditionally, advancing the backoff
    fn idle(&mut self);

    /// Return to the start of the backoff
    fn reset(&mut self);
}

impl<I: IdleStrategy + ?Sized> IdleStrategy for &mut I {
    fn idle_with(&mut self, work_count: usize) {
        (**self).idle_with(work_count);
    }

    fn idle(&mut self) {
        (**self).idle();
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

impl<I: IdleStrategy + ?Sized> IdleStrategy for Box<I> {
    fn idle_with(&mut self, work_count: usize) {
        (**self).idle_with(work_count);
    }

    fn idle(&mut self) {
        (**self).idle();
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Spin, then yield, then park with exponentially growing park time
#[derive(Debug, Clone)]
pub struct BackoffIdleStrategy {
    max_spins: u64,
    max_yields: u64,
    min_park: Duration,
    max_park: Duration,
    spins: u64,
    yields: u64,
    park: Duration,
}

impl BackoffIdleStrategy {
    pub fn new(max_spins: u64, max_yields: u64, min_park: Duration, max_park: Duration) -> Self {
        let max_park = max_park.max(min_park);
        Self {
            max_spins,
            max_yields,
            min_park,
            max_park,
            spins: 0,
            yields: 0,
            park: min_park,
        }
    }

    /// Current park duration, exposed for inspection
    pub fn current_park(&self) -> Duration {
        self.park
    }
}

impl Default for BackoffIdleStrategy {
    fn default() -> Self {
        Self::new(10, 5, Duration::from_micros(1), Duration::from_millis(1))
    }
}

impl IdleStrategy for BackoffIdleStrategy {
    fn idle(&mut self) {
        if self.spins < self.max_spins {
            self.spins += 1;
            std::hint::spin_loop();
        } else if self.yields < self.max_yields {
            self.yields += 1;
            thread::yield_now();
        } else {
            thread::sleep(self.park);
            self.park = (self.park * 2).min(self.max_park);
        }
    }

    fn reset(&mut self) {
        self.spins = 0;
        self.yields = 0;
        self.park = self.min_park;
    }
}

/// Sleep a fixed period every time
#[derive(Debug, Clone, Copy)]
pub struct SleepingIdleStrategy {
    period: Duration,
}

impl SleepingIdleStrategy {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl IdleStrategy for SleepingIdleStrategy {
    fn idle(&mut self) {
        thread::sleep(self.period);
    }

    fn reset(&mut self) {}
}

/// Never gives up the thread
#[derive(Debug, Clone, Copy, Default)]
pub struct BusySpinIdleStrategy;

impl IdleStrategy for BusySpinIdleStrategy {
    fn idle(&mut self) {
        std::hint::spin_loop();
    }

    fn reset(&mut self) {}
}

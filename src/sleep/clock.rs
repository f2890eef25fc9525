//! Clock and coarse-sleep sources used by the precision sleep.
//!
//! The sleep algorithm only needs two things from its platform: a monotonic
//! clock it can read and subtract, and a blocking sleep that may overshoot
//! but never returns early. Both are traits so a deterministic clock can be
//! swapped in for tests.

use std::fmt::Debug;
use std::ops::Sub;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock {
    type Instant: Copy + Ord + Debug + Sub<Output = Duration>;

    fn now(&self) -> Self::Instant;
}

/// A blocking, scheduler-driven sleep with platform-dependent slack.
pub trait CoarseSleep {
    fn sleep(&self, duration: Duration);
}

impl<T: Clock + ?Sized> Clock for &T {
    type Instant = T::Instant;

    #[inline]
    fn now(&self) -> Self::Instant {
        (**self).now()
    }
}

impl<T: CoarseSleep + ?Sized> CoarseSleep for &T {
    #[inline]
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// `std::time::Instant` backed clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    type Instant = Instant;

    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// `std::thread::sleep` backed coarse sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl CoarseSleep for ThreadSleeper {
    #[inline]
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Point in time on a [`ManualClock`], measured from the clock's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ManualInstant(Duration);

impl ManualInstant {
    pub fn since_origin(self) -> Duration {
        self.0
    }
}

impl Sub for ManualInstant {
    type Output = Duration;

    fn sub(self, earlier: ManualInstant) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Deterministic clock for tests and simulations.
///
/// Every read advances time by `tick`, so spin loops always make progress.
/// A coarse sleep advances time by the requested duration plus `overshoot`,
/// modelling a scheduler that wakes the thread late.
#[derive(Debug)]
pub struct ManualClock {
    now_nanos: AtomicU64,
    tick_nanos: u64,
    overshoot_nanos: u64,
    reads: AtomicU64,
    coarse_sleeps: AtomicU64,
}

impl ManualClock {
    pub fn new(tick: Duration, overshoot: Duration) -> Self {
        Self {
            now_nanos: AtomicU64::new(0),
            tick_nanos: duration_nanos(tick),
            overshoot_nanos: duration_nanos(overshoot),
            reads: AtomicU64::new(0),
            coarse_sleeps: AtomicU64::new(0),
        }
    }

    /// Current time without advancing the clock.
    pub fn peek(&self) -> ManualInstant {
        ManualInstant(Duration::from_nanos(self.now_nanos.load(Ordering::Relaxed)))
    }

    pub fn advance(&self, by: Duration) {
        self.now_nanos.fetch_add(duration_nanos(by), Ordering::Relaxed);
    }

    /// Number of `now()` calls so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of coarse sleeps performed so far.
    pub fn coarse_sleeps(&self) -> u64 {
        self.coarse_sleeps.load(Ordering::Relaxed)
    }
}

impl Clock for ManualClock {
    type Instant = ManualInstant;

    fn now(&self) -> ManualInstant {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let previous = self.now_nanos.fetch_add(self.tick_nanos, Ordering::Relaxed);
        ManualInstant(Duration::from_nanos(previous))
    }
}

impl CoarseSleep for ManualClock {
    fn sleep(&self, duration: Duration) {
        self.coarse_sleeps.fetch_add(1, Ordering::Relaxed);
        let slept = duration_nanos(duration).saturating_add(self.overshoot_nanos);
        self.now_nanos.fetch_add(slept, Ordering::Relaxed);
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_runs_backward() {
        let clock = MonotonicClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn manual_clock_ticks_on_every_read() {
        let clock = ManualClock::new(Duration::from_micros(1), Duration::ZERO);
        let a = clock.now();
        let b = clock.now();
        assert_eq!(b - a, Duration::from_micros(1));
        assert_eq!(clock.reads(), 2);
    }

    #[test]
    fn manual_clock_coarse_sleep_adds_overshoot() {
        let clock = ManualClock::new(Duration::ZERO, Duration::from_micros(250));
        let before = clock.peek();
        clock.sleep(Duration::from_millis(1));
        assert_eq!(clock.peek() - before, Duration::from_micros(1250));
        assert_eq!(clock.coarse_sleeps(), 1);
    }

    #[test]
    fn manual_clock_advance_does_not_count_as_read() {
        let clock = ManualClock::new(Duration::from_nanos(10), Duration::ZERO);
        clock.advance(Duration::from_millis(2));
        assert_eq!(clock.peek().since_origin(), Duration::from_millis(2));
        assert_eq!(clock.reads(), 0);
    }

    #[test]
    fn manual_instant_subtraction_saturates() {
        let early = ManualInstant(Duration::from_micros(5));
        let late = ManualInstant(Duration::from_micros(9));
        assert_eq!(early - late, Duration::ZERO);
    }
}

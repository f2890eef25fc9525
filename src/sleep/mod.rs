//! Hybrid precision sleep.
//!
//! A request is served in two phases: a coarse, scheduler-driven sleep for
//! everything except a trailing reserve window, then a spin on the monotonic
//! clock until the full request has elapsed. The result is never early,
//! assuming the coarse sleep itself never returns early.

pub mod clock;
pub mod reserve;

use std::time::Duration;

use lazy_static::lazy_static;

pub use clock::{Clock, CoarseSleep, ManualClock, ManualInstant, MonotonicClock, ThreadSleeper};
pub use reserve::{ReserveSchedule, ReserveStep, ScheduleError};

lazy_static! {
    static ref DEFAULT_SLEEP: PrecisionSleep = PrecisionSleep::default();
}

/// What each phase of one [`PrecisionSleep::sleep_until_or_later`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SleepOutcome {
    pub requested: Duration,
    pub reserve: Duration,
    /// Time elapsed after the coarse phase, measured from entry.
    pub coarse_elapsed: Duration,
    pub spin_iterations: u64,
}

impl SleepOutcome {
    /// Whether the coarse phase alone already covered the request.
    pub fn coarse_only(&self) -> bool {
        self.spin_iterations == 0
    }
}

/// Coarse-sleep-then-spin delay over a clock `C` and coarse sleeper `S`.
#[derive(Debug, Clone)]
pub struct PrecisionSleep<C = MonotonicClock, S = ThreadSleeper> {
    clock: C,
    sleeper: S,
    schedule: ReserveSchedule,
}

impl Default for PrecisionSleep {
    fn default() -> Self {
        Self::new(MonotonicClock, ThreadSleeper)
    }
}

impl<C: Clock, S: CoarseSleep> PrecisionSleep<C, S> {
    pub fn new(clock: C, sleeper: S) -> Self {
        Self {
            clock,
            sleeper,
            schedule: ReserveSchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: ReserveSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> &ReserveSchedule {
        &self.schedule
    }

    /// Block for at least `microseconds`, returning as soon after as the
    /// clock allows. `0` returns immediately without touching the clock.
    pub fn sleep_until_or_later(&self, microseconds: u32) -> SleepOutcome {
        if microseconds == 0 {
            return SleepOutcome::default();
        }

        let mark = self.clock.now();
        let requested = Duration::from_micros(u64::from(microseconds));
        let reserve = Duration::from_micros(u64::from(self.schedule.reserve_for(microseconds)));

        // The reserve can meet or exceed a small request; then the whole
        // request is spun.
        if let Some(chunk) = requested.checked_sub(reserve).filter(|c| !c.is_zero()) {
            self.sleeper.sleep(chunk);
        }

        let coarse_elapsed = self.clock.now() - mark;
        let mut spin_iterations = 0u64;

        if let Some(remaining) = requested
            .checked_sub(coarse_elapsed)
            .filter(|r| !r.is_zero())
        {
            let spin_mark = self.clock.now();
            while self.clock.now() - spin_mark < remaining {
                std::hint::spin_loop();
                spin_iterations += 1;
            }
        }

        SleepOutcome {
            requested,
            reserve,
            coarse_elapsed,
            spin_iterations,
        }
    }
}

/// Precision sleep on the monotonic clock with the default reserve schedule.
pub fn sleep_until_or_later(microseconds: u32) {
    DEFAULT_SLEEP.sleep_until_or_later(microseconds);
}

/// The platform's plain coarse sleep, used as the comparison baseline.
pub fn coarse_sleep(microseconds: u32) {
    std::thread::sleep(Duration::from_micros(u64::from(microseconds)));
}

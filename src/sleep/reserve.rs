//! Reserve-window schedule for the spin phase.
//!
//! The reserve is the tail of a request that the coarse sleep leaves
//! unslept. It is chosen from `logx = round(ln(requested_us)) + 1` by a
//! table of breakpoints. The breakpoints are empirical, so they are data
//! that configuration can override.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Requests whose `logx` is below `log_below` get `reserve_us` of spin time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveStep {
    #[serde(rename = "LogBelow")]
    pub log_below: i32,
    #[serde(rename = "ReserveUs")]
    pub reserve_us: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawReserveSchedule {
    #[serde(rename = "Steps")]
    steps: Vec<ReserveStep>,
    #[serde(rename = "FallbackUs")]
    fallback_us: u32,
}

/// Ordered breakpoints mapping a request size to its reserve window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReserveSchedule", into = "RawReserveSchedule")]
pub struct ReserveSchedule {
    steps: Vec<ReserveStep>,
    fallback_us: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Breakpoints must be strictly increasing in `log_below`.
    UnorderedThresholds { previous: i32, next: i32 },
    /// Larger requests must not get a smaller reserve.
    ShrinkingReserve { previous: u32, next: u32 },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::UnorderedThresholds { previous, next } => write!(
                f,
                "reserve thresholds must be strictly increasing ({} followed by {})",
                previous, next
            ),
            ScheduleError::ShrinkingReserve { previous, next } => write!(
                f,
                "reserve sizes must not decrease ({}us followed by {}us)",
                previous, next
            ),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl ReserveSchedule {
    pub fn new(steps: Vec<ReserveStep>, fallback_us: u32) -> Result<Self, ScheduleError> {
        for pair in steps.windows(2) {
            if pair[1].log_below <= pair[0].log_below {
                return Err(ScheduleError::UnorderedThresholds {
                    previous: pair[0].log_below,
                    next: pair[1].log_below,
                });
            }
            if pair[1].reserve_us < pair[0].reserve_us {
                return Err(ScheduleError::ShrinkingReserve {
                    previous: pair[0].reserve_us,
                    next: pair[1].reserve_us,
                });
            }
        }
        if let Some(last) = steps.last() {
            if fallback_us < last.reserve_us {
                return Err(ScheduleError::ShrinkingReserve {
                    previous: last.reserve_us,
                    next: fallback_us,
                });
            }
        }
        Ok(Self { steps, fallback_us })
    }

    pub fn steps(&self) -> &[ReserveStep] {
        &self.steps
    }

    pub fn fallback_us(&self) -> u32 {
        self.fallback_us
    }

    /// Reserve window in microseconds for a request of `requested_us`.
    ///
    /// May be larger than the request itself for very small requests.
    pub fn reserve_for(&self, requested_us: u32) -> u32 {
        let logx = log_bucket(requested_us);
        self.steps
            .iter()
            .find(|step| logx < i64::from(step.log_below))
            .map_or(self.fallback_us, |step| step.reserve_us)
    }
}

impl Default for ReserveSchedule {
    fn default() -> Self {
        let steps = [(2, 1), (3, 10), (4, 100), (6, 1_000)]
            .into_iter()
            .map(|(log_below, reserve_us)| ReserveStep { log_below, reserve_us })
            .collect();
        Self {
            steps,
            fallback_us: 10_000,
        }
    }
}

impl TryFrom<RawReserveSchedule> for ReserveSchedule {
    type Error = ScheduleError;

    fn try_from(raw: RawReserveSchedule) -> Result<Self, Self::Error> {
        ReserveSchedule::new(raw.steps, raw.fallback_us)
    }
}

impl From<ReserveSchedule> for RawReserveSchedule {
    fn from(schedule: ReserveSchedule) -> Self {
        RawReserveSchedule {
            steps: schedule.steps,
            fallback_us: schedule.fallback_us,
        }
    }
}

/// `round(ln(us)) + 1`, rounding half away from zero. `0` maps to bucket 0.
pub fn log_bucket(requested_us: u32) -> i64 {
    if requested_us == 0 {
        return 0;
    }
    (f64::from(requested_us).ln().round() as i64) + 1
}

//! Trial series: repeated timed sleeps at generated request sizes
//!
//! Trial `i` of a case requests `offset + i * multiplier` microseconds. The
//! error sample of each trial is the observed duration minus the request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Instant;

use crate::core::config::{validate_positive_u32, validate_positive_u64};
use crate::sleep::{coarse_sleep, PrecisionSleep};
use crate::stats::{RunningStats, TrialRecord};
use crate::utils::helpers::request_micros;

/// Which sleep implementation a series exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    PrecisionSleep,
    CoarseSleep,
}

impl Strategy {
    pub fn all() -> [Strategy; 2] {
        [Strategy::PrecisionSleep, Strategy::CoarseSleep]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::PrecisionSleep => "sleep_until_or_later",
            Strategy::CoarseSleep => "thread::sleep",
        }
    }

    fn sleep(self, precise: &PrecisionSleep, microseconds: u32) {
        match self {
            Strategy::PrecisionSleep => {
                precise.sleep_until_or_later(microseconds);
            }
            Strategy::CoarseSleep => coarse_sleep(microseconds),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Request generator: an offset and a per-trial multiplier, both in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "OffsetUs", deserialize_with = "validate_positive_u64")]
    pub offset_us: u64,
    #[serde(rename = "MultiplierUs", deserialize_with = "validate_positive_u32")]
    pub multiplier_us: u32,
}

impl TestCase {
    pub fn new(offset_us: u64, multiplier_us: u32) -> Self {
        Self {
            offset_us,
            multiplier_us,
        }
    }

    /// A single user-chosen request size, stepping by one microsecond
    pub fn single(offset_us: u64) -> Self {
        Self::new(offset_us, 1)
    }

    /// Cases spanning one millisecond to one second
    pub fn builtin() -> Vec<TestCase> {
        vec![
            TestCase::new(1023, 1),
            TestCase::new(10023, 10),
            TestCase::new(100023, 100),
            TestCase::new(1002323, 100),
        ]
    }

    pub fn request_us(&self, trial: u32) -> u64 {
        self.offset_us + u64::from(trial) * u64::from(self.multiplier_us)
    }
}

/// Run `trials` timed sleeps on the calling thread, feeding each error
/// sample into `stats`. `precise` is only used by
/// [`Strategy::PrecisionSleep`].
pub fn run_series(
    strategy: Strategy,
    case: TestCase,
    trials: u32,
    precise: &PrecisionSleep,
    stats: &mut RunningStats<f64>,
) -> io::Result<Vec<TrialRecord>> {
    let mut records = Vec::with_capacity(trials as usize);
    for trial in 0..trials {
        let requested_us = case.request_us(trial);
        let microseconds = request_micros(requested_us)?;

        let mark = Instant::now();
        strategy.sleep(precise, microseconds);
        let took = mark.elapsed();

        let record = TrialRecord::new(strategy, case.offset_us, trial, requested_us, took);
        log::debug!(
            "{} {}/{}: expected {}us, observed {:.3}us, error {:+.3}us",
            strategy,
            trial + 1,
            trials,
            requested_us,
            record.observed_us,
            record.error_us
        );
        stats.add(record.error_us);
        records.push(record);
    }
    Ok(records)
}

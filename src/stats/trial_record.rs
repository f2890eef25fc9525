//! Per-trial measurement records
//!
//! One record per sleep call, written to the results CSV.

use serde::Serialize;
use std::time::Duration;

use crate::bench::Strategy;
use crate::utils::helpers::micros_f64;

/// A single timed sleep request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub strategy: Strategy,
    pub case_offset_us: u64,
    pub trial: u32,
    pub requested_us: u64,
    pub observed_us: f64,
    /// Observed minus requested; negative means the sleep returned early.
    pub error_us: f64,
}

impl TrialRecord {
    pub fn new(
        strategy: Strategy,
        case_offset_us: u64,
        trial: u32,
        requested_us: u64,
        observed: Duration,
    ) -> Self {
        let observed_us = micros_f64(observed);
        Self {
            strategy,
            case_offset_us,
            trial,
            requested_us,
            observed_us,
            error_us: observed_us - requested_us as f64,
        }
    }
}

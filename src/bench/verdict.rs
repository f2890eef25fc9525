//! Pass/fail comparison of a precision series against its coarse baseline

use serde::{Deserialize, Serialize};

use crate::bench::series::TestCase;
use crate::stats::RunningStats;

/// Thresholds a case must meet to pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// Required ratio of baseline to precision minimum overshoot
    pub better_by: f64,
    /// Clock-resolution slack in microseconds
    pub epsilon_us: f64,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            better_by: 2.0,
            epsilon_us: 1.0,
        }
    }
}

/// Result of one test case: both series and the checks applied to them
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub case: TestCase,
    pub precise: RunningStats<f64>,
    pub baseline: RunningStats<f64>,
    pub counts_match: bool,
    pub precise_never_early: bool,
    pub baseline_never_early: bool,
    /// `baseline.min / (max(precise.min, 0) + epsilon)`, when both minima
    /// exist and the denominator is positive
    pub improvement: Option<f64>,
    pub improvement_ok: bool,
}

impl CaseReport {
    pub fn evaluate(
        case: TestCase,
        precise: RunningStats<f64>,
        baseline: RunningStats<f64>,
        criteria: &Criteria,
    ) -> Self {
        let never_early = |stats: &RunningStats<f64>| {
            stats
                .minimum()
                .map_or(false, |min| min >= -criteria.epsilon_us)
        };

        let improvement = match (precise.minimum(), baseline.minimum()) {
            (Some(p), Some(b)) => {
                let denominator = p.max(0.0) + criteria.epsilon_us;
                (denominator > 0.0).then(|| b / denominator)
            }
            _ => None,
        };

        Self {
            case,
            counts_match: precise.count() == baseline.count(),
            precise_never_early: never_early(&precise),
            baseline_never_early: never_early(&baseline),
            improvement_ok: improvement.map_or(false, |ratio| ratio >= criteria.better_by),
            improvement,
            precise,
            baseline,
        }
    }

    pub fn passed(&self) -> bool {
        self.counts_match
            && self.precise_never_early
            && self.baseline_never_early
            && self.improvement_ok
    }

    pub fn verdict(&self) -> &'static str {
        if self.passed() {
            "Passed"
        } else {
            "Failed"
        }
    }
}

//! Online accumulator for timing error samples.
//!
//! Min, max, sum and sum of squares are updated in O(1) per sample. Moments
//! are accumulated in `f64` so integer samples cannot overflow them; the
//! `T`-typed total is checked and reports overflow instead of wrapping. The full
//! sample history is kept so the median is exact; it is computed lazily and
//! memoized until the next mutation.

use serde::Serialize;
use std::cell::OnceCell;
use std::fmt::{self, Debug, Display};
use std::ops::{Add, AddAssign};

/// Numeric types a [`RunningStats`] can accumulate.
pub trait Sample:
    Copy + PartialOrd + Add<Output = Self> + Debug + Display
{
    const LOWEST: Self;
    const HIGHEST: Self;
    const ZERO: Self;

    fn to_f64(self) -> f64;

    /// `None` when the sum does not fit in `Self`.
    fn checked_sum(self, other: Self) -> Option<Self>;
}

macro_rules! impl_sample {
    (float: $($t:ty),*) => {
        $(
            impl Sample for $t {
                const LOWEST: Self = <$t>::MIN;
                const HIGHEST: Self = <$t>::MAX;
                const ZERO: Self = 0.0;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn checked_sum(self, other: Self) -> Option<Self> {
                    Some(self + other)
                }
            }
        )*
    };
    (int: $($t:ty),*) => {
        $(
            impl Sample for $t {
                const LOWEST: Self = <$t>::MIN;
                const HIGHEST: Self = <$t>::MAX;
                const ZERO: Self = 0;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn checked_sum(self, other: Self) -> Option<Self> {
                    self.checked_add(other)
                }
            }
        )*
    };
}

impl_sample!(float: f32, f64);
impl_sample!(int: i32, i64, u32, u64);

/// A statistic was requested that the current sample count cannot define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    /// No samples have been added.
    Empty,
    /// The statistic needs at least `required` samples.
    InsufficientSamples { required: u64, actual: u64 },
    /// The running total no longer fits in the sample type.
    Overflow,
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::Empty => write!(f, "no samples have been added"),
            StatsError::InsufficientSamples { required, actual } => write!(
                f,
                "statistic needs at least {} samples, have {}",
                required, actual
            ),
            StatsError::Overflow => write!(f, "running total overflowed the sample type"),
        }
    }
}

impl std::error::Error for StatsError {}

/// Running min/max/mean/variance/RMS/median over added samples.
///
/// Not synchronized: each worker owns its accumulator and results are
/// combined with [`RunningStats::merge`].
#[derive(Debug, Clone)]
pub struct RunningStats<T: Sample> {
    minimum: T,
    maximum: T,
    /// `None` once the `T`-typed sum has overflowed.
    total: Option<T>,
    sum: f64,
    squared_total: f64,
    count: u64,
    samples: Vec<T>,
    median_cache: OnceCell<f64>,
}

/// Serializable snapshot of a [`RunningStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub rms: Option<f64>,
}

impl<T: Sample> Default for RunningStats<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample> RunningStats<T> {
    pub fn new() -> Self {
        Self {
            minimum: T::HIGHEST,
            maximum: T::LOWEST,
            total: Some(T::ZERO),
            sum: 0.0,
            squared_total: 0.0,
            count: 0,
            samples: Vec::new(),
            median_cache: OnceCell::new(),
        }
    }

    pub fn add(&mut self, value: T) {
        if value < self.minimum {
            self.minimum = value;
        }
        if value > self.maximum {
            self.maximum = value;
        }
        self.total = self.total.and_then(|t| t.checked_sum(value));
        let x = value.to_f64();
        self.sum += x;
        self.squared_total += x * x;
        self.count += 1;
        self.samples.push(value);
        self.median_cache.take();
    }

    pub fn minimum(&self) -> Option<T> {
        (self.count > 0).then_some(self.minimum)
    }

    pub fn maximum(&self) -> Option<T> {
        (self.count > 0).then_some(self.maximum)
    }

    /// Sum of all samples in the sample type.
    pub fn total(&self) -> Result<T, StatsError> {
        self.total.ok_or(StatsError::Overflow)
    }

    pub fn squared_total(&self) -> f64 {
        self.squared_total
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Samples in insertion order.
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn mean(&self) -> Result<f64, StatsError> {
        let n = self.require(1)?;
        Ok(self.sum / n)
    }

    /// Unbiased sample variance from the running sum and sum of squares.
    pub fn variance(&self) -> Result<f64, StatsError> {
        let n = self.require(2)?;
        Ok((self.squared_total - self.sum * self.sum / n) / (n - 1.0))
    }

    pub fn std_dev(&self) -> Result<f64, StatsError> {
        // Cancellation in the two-moment formula can leave a tiny negative.
        self.variance().map(|v| v.max(0.0).sqrt())
    }

    pub fn rms(&self) -> Result<f64, StatsError> {
        let n = self.require(1)?;
        Ok((self.squared_total / n).sqrt())
    }

    /// Exact median; the mean of the two middle samples for even counts.
    pub fn median(&self) -> Result<f64, StatsError> {
        self.require(1)?;
        Ok(*self.median_cache.get_or_init(|| median_of(&self.samples)))
    }

    /// Fold `other` into `self` as if its samples had been added here.
    pub fn merge(&mut self, other: &RunningStats<T>) {
        if other.count == 0 {
            return;
        }
        if other.minimum < self.minimum {
            self.minimum = other.minimum;
        }
        if other.maximum > self.maximum {
            self.maximum = other.maximum;
        }
        self.total = match (self.total, other.total) {
            (Some(a), Some(b)) => a.checked_sum(b),
            _ => None,
        };
        self.sum += other.sum;
        self.squared_total += other.squared_total;
        self.count += other.count;
        self.samples.extend_from_slice(&other.samples);
        self.median_cache.take();
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            minimum: self.minimum().map(Sample::to_f64),
            maximum: self.maximum().map(Sample::to_f64),
            median: self.median().ok(),
            mean: self.mean().ok(),
            std_dev: self.std_dev().ok(),
            rms: self.rms().ok(),
        }
    }

    fn require(&self, required: u64) -> Result<f64, StatsError> {
        match self.count {
            0 => Err(StatsError::Empty),
            actual if actual < required => {
                Err(StatsError::InsufficientSamples { required, actual })
            }
            n => Ok(n as f64),
        }
    }
}

fn median_of<T: Sample>(samples: &[T]) -> f64 {
    let mut sorted: Vec<f64> = samples.iter().map(|s| s.to_f64()).collect();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

impl<T: Sample> AddAssign<&RunningStats<T>> for RunningStats<T> {
    fn add_assign(&mut self, other: &RunningStats<T>) {
        self.merge(other);
    }
}

impl<T: Sample> Add for RunningStats<T> {
    type Output = RunningStats<T>;

    fn add(mut self, other: RunningStats<T>) -> RunningStats<T> {
        self.merge(&other);
        self
    }
}

impl<T: Sample> Extend<T> for RunningStats<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<T: Sample> FromIterator<T> for RunningStats<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        stats.extend(iter);
        stats
    }
}

struct OrNa<V>(Option<V>);

impl<V: Display> Display for OrNa<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "{}", v),
            None => f.write_str("n/a"),
        }
    }
}

/// Debug report, one labeled field per line.
impl<T: Sample> Display for RunningStats<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Count: {}", self.count)?;
        writeln!(f, "Min: {}", OrNa(self.minimum()))?;
        writeln!(f, "Max: {}", OrNa(self.maximum()))?;
        writeln!(f, "Median: {}", OrNa(self.median().ok()))?;
        writeln!(f, "Mean: {}", OrNa(self.mean().ok()))?;
        writeln!(f, "Std: {}", OrNa(self.std_dev().ok()))?;
        writeln!(f, "RMS: {}", OrNa(self.rms().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::{RunningStats, StatsError};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_accumulator_reports_domain_errors() {
        let stats = RunningStats::<f64>::new();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.minimum(), None);
        assert_eq!(stats.maximum(), None);
        assert_eq!(stats.total(), Ok(0.0));
        assert_eq!(stats.mean(), Err(StatsError::Empty));
        assert_eq!(stats.variance(), Err(StatsError::Empty));
        assert_eq!(stats.rms(), Err(StatsError::Empty));
        assert_eq!(stats.median(), Err(StatsError::Empty));
    }

    #[test]
    fn variance_needs_two_samples() {
        let stats: RunningStats<f64> = [3.0].into_iter().collect();
        assert_eq!(stats.mean(), Ok(3.0));
        assert_eq!(stats.median(), Ok(3.0));
        assert_eq!(
            stats.variance(),
            Err(StatsError::InsufficientSamples { required: 2, actual: 1 })
        );
    }

    #[test]
    fn first_sample_sets_both_extrema() {
        let mut stats = RunningStats::<f32>::new();
        stats.add(-4.5);
        assert_eq!(stats.minimum(), Some(-4.5));
        assert_eq!(stats.maximum(), Some(-4.5));
    }

    #[test]
    fn median_odd_and_even() {
        let odd: RunningStats<i32> = [1, 3, 2].into_iter().collect();
        assert_eq!(odd.median(), Ok(2.0));

        let even: RunningStats<i32> = [1, 2, 3, 4].into_iter().collect();
        assert_eq!(even.median(), Ok(2.5));
    }

    #[test]
    fn median_cache_invalidated_by_add() {
        let mut stats: RunningStats<f64> = [1.0, 3.0, 2.0].into_iter().collect();
        assert_eq!(stats.median(), Ok(2.0));
        stats.add(10.0);
        assert_eq!(stats.median(), Ok(2.5));
        stats.add(11.0);
        assert_eq!(stats.median(), Ok(3.0));
    }

    #[test]
    fn known_moments() {
        let stats: RunningStats<f64> =
            [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter().collect();
        assert_eq!(stats.count(), 8);
        assert!(approx(stats.mean().unwrap(), 5.0));
        assert!(approx(stats.variance().unwrap(), 32.0 / 7.0));
        assert!(approx(stats.std_dev().unwrap(), (32.0f64 / 7.0).sqrt()));
        // sum of squares is 232
        assert!(approx(stats.rms().unwrap(), 29.0f64.sqrt()));
        assert!(approx(stats.median().unwrap(), 4.5));
        assert_eq!(stats.minimum(), Some(2.0));
        assert_eq!(stats.maximum(), Some(9.0));
    }

    #[test]
    fn merge_keeps_history_and_median() {
        let mut a: RunningStats<f64> = [1.0, 2.0].into_iter().collect();
        let b: RunningStats<f64> = [3.0, 4.0, 100.0].into_iter().collect();
        assert_eq!(a.median(), Ok(1.5));
        a += &b;
        assert_eq!(a.count(), 5);
        assert_eq!(a.samples().len(), 5);
        assert_eq!(a.minimum(), Some(1.0));
        assert_eq!(a.maximum(), Some(100.0));
        assert_eq!(a.median(), Ok(3.0));
    }

    #[test]
    fn merging_empty_is_a_no_op() {
        let mut a: RunningStats<i64> = [5, -5].into_iter().collect();
        a.merge(&RunningStats::new());
        assert_eq!(a.count(), 2);
        assert_eq!(a.minimum(), Some(-5));

        let merged = RunningStats::new() + a.clone();
        assert_eq!(merged.count(), 2);
        assert_eq!(merged.maximum(), Some(5));
    }

    #[test]
    fn large_integer_samples_keep_moments_exact() {
        let mut stats = RunningStats::<i32>::new();
        stats.add(50_000);
        stats.add(50_000);
        assert_eq!(stats.total(), Ok(100_000));
        assert_eq!(stats.rms(), Ok(50_000.0));
        assert_eq!(stats.variance(), Ok(0.0));
        assert_eq!(stats.squared_total(), 5_000_000_000.0);

        let wide: RunningStats<i64> = [4_000_000_000, 2_000_000_000].into_iter().collect();
        assert_eq!(wide.mean(), Ok(3_000_000_000.0));
        assert_eq!(wide.variance(), Ok(2.0e18));
        assert!((wide.rms().unwrap() - 1.0e19f64.sqrt()).abs() < 1.0);
    }

    #[test]
    fn total_overflow_is_reported_not_wrapped() {
        let mut stats = RunningStats::<i32>::new();
        stats.add(i32::MAX);
        stats.add(1);
        assert_eq!(stats.total(), Err(StatsError::Overflow));
        assert_eq!(stats.mean(), Ok((f64::from(i32::MAX) + 1.0) / 2.0));
        assert_eq!(stats.maximum(), Some(i32::MAX));

        let mut merged: RunningStats<u32> = [u32::MAX].into_iter().collect();
        let one: RunningStats<u32> = [1u32].into_iter().collect();
        merged += &one;
        assert_eq!(merged.total(), Err(StatsError::Overflow));
        assert_eq!(merged.count(), 2);
    }

    #[test]
    fn report_lists_fields_in_order() {
        let stats: RunningStats<i32> = [1, 2, 3].into_iter().collect();
        let report = stats.to_string();
        let labels: Vec<&str> = report
            .lines()
            .map(|line| line.split(':').next().unwrap().trim())
            .collect();
        assert_eq!(labels, ["Count", "Min", "Max", "Median", "Mean", "Std", "RMS"]);
        assert!(report.starts_with("Count: 3\n"));
    }

    #[test]
    fn report_marks_undefined_fields() {
        let report = RunningStats::<f64>::new().to_string();
        assert!(report.contains("Min: n/a"));
        assert!(report.contains("Std: n/a"));
    }

    #[test]
    fn summary_serializes() {
        let stats: RunningStats<f64> = [1.0, 3.0].into_iter().collect();
        let json = serde_json::to_value(stats.summary()).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["median"], 2.0);
    }
}

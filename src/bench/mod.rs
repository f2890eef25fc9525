//! Comparison harness: precision sleep against the coarse baseline

pub mod series;
pub mod verdict;
pub mod worker;

pub use series::{run_series, Strategy, TestCase};
pub use verdict::{CaseReport, Criteria};
pub use worker::{run_series_blocking, SeriesResult};

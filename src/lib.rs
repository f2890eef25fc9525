//! Precision Sleep Benchmark Library
//!
//! A hybrid coarse-sleep-then-spin delay that never returns early, an online
//! statistics accumulator for timing errors, and a harness comparing the
//! delay against the platform's plain `thread::sleep`.

pub mod bench;
pub mod core;
pub mod sleep;
pub mod stats;
pub mod ui;
pub mod utils;

pub use crate::core::run_benchmark;
pub use crate::sleep::{coarse_sleep, sleep_until_or_later, PrecisionSleep};
pub use crate::stats::{RunningStats, StatsError};

/// Library version
pub const VERSION: &str = "0.1.0";

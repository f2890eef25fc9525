//! Runs a series on a dedicated blocking thread
//!
//! The series owns its accumulator while it runs and hands it back on
//! completion; nothing is shared between concurrently running series.

use std::io::{self, Error, ErrorKind};
use std::time::Duration;
use tokio::time::timeout;

use crate::bench::series::{run_series, Strategy, TestCase};
use crate::sleep::PrecisionSleep;
use crate::stats::{RunningStats, TrialRecord};

/// Completed series: its accumulator and the individual trials
#[derive(Debug, Clone)]
pub struct SeriesResult {
    pub strategy: Strategy,
    pub stats: RunningStats<f64>,
    pub records: Vec<TrialRecord>,
}

pub async fn run_series_blocking(
    strategy: Strategy,
    case: TestCase,
    trials: u32,
    precise: PrecisionSleep,
    limit: Duration,
) -> io::Result<SeriesResult> {
    let handle = tokio::task::spawn_blocking(move || {
        let mut stats = RunningStats::new();
        run_series(strategy, case, trials, &precise, &mut stats).map(|records| (stats, records))
    });

    match timeout(limit, handle).await {
        Ok(Ok(Ok((stats, records)))) => Ok(SeriesResult {
            strategy,
            stats,
            records,
        }),
        Ok(Ok(Err(e))) => Err(e),
        Ok(Err(e)) => {
            log::error!("{} worker for {}us panicked: {}", strategy, case.offset_us, e);
            Err(Error::new(ErrorKind::Other, e))
        }
        Err(_) => {
            log::error!(
                "{} series for {}us did not finish within {:?}",
                strategy,
                case.offset_us,
                limit
            );
            Err(Error::new(ErrorKind::TimedOut, "sleep series timeout"))
        }
    }
}

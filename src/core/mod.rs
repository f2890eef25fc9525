pub mod config;
pub mod system;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

use crate::bench::{run_series_blocking, CaseReport, Strategy, TestCase};
use crate::sleep::{PrecisionSleep, ReserveSchedule};
use crate::stats::{RunningStats, TrialRecord};
use crate::ui::report;

pub use config::{load_parameters, BenchmarkingParameters, SETTINGS_FILE};

/// Coarse-sleep slack check: this many 1ms sleeps before the cases run
const SLACK_TRIALS: u32 = 5;
const SLACK_REQUEST_US: u64 = 1000;

/// Outcome of a full run
#[derive(Debug, Clone)]
pub struct BenchmarkSummary {
    pub cases: Vec<CaseReport>,
    pub overall_precise: RunningStats<f64>,
    pub overall_baseline: RunningStats<f64>,
}

impl BenchmarkSummary {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }
}

pub async fn run_benchmark() -> io::Result<BenchmarkSummary> {
    let parameters = load_parameters(Path::new(SETTINGS_FILE))?;
    run_with(&parameters).await
}

pub async fn run_with(params: &BenchmarkingParameters) -> io::Result<BenchmarkSummary> {
    report::print_title();
    report::print_system(&system::system_summary());

    let precise = params.precision_sleep();
    let limit = params.series_timeout();
    let criteria = params.criteria();
    let cases = params.cases();

    // Let the process settle before the first timed sleep
    if !params.warmup().is_zero() {
        sleep(params.warmup()).await;
    }

    measure_coarse_slack(&precise, limit).await?;

    println!("{}", "Running cases".bold().yellow());
    println!("━━━━━━━━━━━━━━━━━━━");
    log::info!(
        "{} case(s), {} trials per series, better_by {:.1}, epsilon {:.3}us",
        cases.len(),
        params.trials,
        criteria.better_by,
        criteria.epsilon_us
    );

    let pb = ProgressBar::new((cases.len() * Strategy::all().len()) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} series {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut reports = Vec::with_capacity(cases.len());
    let mut records: Vec<TrialRecord> = Vec::new();
    let mut overall_precise = RunningStats::new();
    let mut overall_baseline = RunningStats::new();

    for case in cases {
        pb.set_message(format!("{} {}us", Strategy::PrecisionSleep, case.offset_us));
        let precise_run = run_series_blocking(
            Strategy::PrecisionSleep,
            case,
            params.trials,
            precise.clone(),
            limit,
        )
        .await?;
        pb.inc(1);

        pb.set_message(format!("{} {}us", Strategy::CoarseSleep, case.offset_us));
        let baseline_run = run_series_blocking(
            Strategy::CoarseSleep,
            case,
            params.trials,
            precise.clone(),
            limit,
        )
        .await?;
        pb.inc(1);

        overall_precise.merge(&precise_run.stats);
        overall_baseline.merge(&baseline_run.stats);
        records.extend(precise_run.records);
        records.extend(baseline_run.records);

        let case_report =
            CaseReport::evaluate(case, precise_run.stats, baseline_run.stats, &criteria);
        log::info!("{}us: {}", case.offset_us, case_report.verdict());
        pb.suspend(|| report::print_case(&case_report));
        reports.push(case_report);
    }
    pb.finish_with_message("done");

    println!("\n{}", "Overall".bold().yellow());
    println!("━━━━━━━━━━━━━━━━━━━");
    println!("{}", report::overall_table(&overall_precise, &overall_baseline));

    if let Some(path) = &params.results_file {
        save_trial_records(path, &records)?;
        println!("Trial records written to {}", path.display());
    }

    let summary = BenchmarkSummary {
        cases: reports,
        overall_precise,
        overall_baseline,
    };
    println!(
        "{} passed, {} failed",
        summary.passed().to_string().green(),
        summary.failed().to_string().red()
    );
    println!("{}", report::separator());

    Ok(summary)
}

/// Measure the platform's coarse sleep slack at 1ms and warn when it
/// exceeds the reserve window a 1ms request gets, since the spin phase can
/// then no longer absorb it.
async fn measure_coarse_slack(precise: &PrecisionSleep, limit: Duration) -> io::Result<()> {
    let slack = run_series_blocking(
        Strategy::CoarseSleep,
        TestCase::new(SLACK_REQUEST_US, 0),
        SLACK_TRIALS,
        precise.clone(),
        limit,
    )
    .await?;

    let stats = &slack.stats;
    println!("{}", "Coarse sleep slack".bold().yellow());
    println!("━━━━━━━━━━━━━━━━━━━");
    println!("{}", report::stats_table_for("thread::sleep(1ms)", stats));

    if let Ok(median) = stats.median() {
        if let Some(reserve_us) = slack_exceeds_reserve(precise.schedule(), median) {
            log::warn!(
                "coarse sleep overshoots by {:.1}us, more than the {}us reserve used for {}us requests",
                median,
                reserve_us,
                SLACK_REQUEST_US
            );
        }
    }
    println!();
    Ok(())
}

/// The reserve a slack-check request gets, when `overshoot_us` exceeds it.
fn slack_exceeds_reserve(schedule: &ReserveSchedule, overshoot_us: f64) -> Option<u32> {
    let reserve_us = schedule.reserve_for(SLACK_REQUEST_US as u32);
    (overshoot_us > f64::from(reserve_us)).then_some(reserve_us)
}

pub fn save_trial_records(path: &Path, records: &[TrialRecord]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    log::debug!("wrote {} trial records to {}", records.len(), path.display());
    Ok(())
}

//! Console rendering of benchmark results

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::bench::{CaseReport, Strategy};
use crate::core::system::SystemSummary;
use crate::stats::RunningStats;
use crate::utils::helpers::format_micros;

const HEADER: [&str; 8] = ["Strategy", "Count", "Min", "Max", "Median", "Mean", "Std", "RMS"];

pub fn separator() -> String {
    "=".repeat(60)
}

pub fn print_title() {
    println!("\n{}", separator());
    println!("{:^60}", "Precision Sleep Benchmark".bold().cyan());
    println!("{}\n", separator());
}

pub fn print_system(summary: &SystemSummary) {
    println!("{}", "System Information".bold().yellow());
    println!("━━━━━━━━━━━━━━━━━━━");
    println!("OS:  {}", summary.os);
    println!("CPU: {} ({} logical)", summary.cpu_brand, summary.logical_cpus);
    println!();
}

/// One table row of error statistics, in microseconds
pub fn stats_row(label: &str, stats: &RunningStats<f64>) -> Vec<String> {
    let summary = stats.summary();
    vec![
        label.to_string(),
        summary.count.to_string(),
        format_micros(summary.minimum),
        format_micros(summary.maximum),
        format_micros(summary.median),
        format_micros(summary.mean),
        format_micros(summary.std_dev),
        format_micros(summary.rms),
    ]
}

fn stats_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(HEADER.to_vec());
    table
}

pub fn stats_table_for(label: &str, stats: &RunningStats<f64>) -> Table {
    let mut table = stats_table();
    table.add_row(stats_row(label, stats));
    table
}

pub fn case_table(report: &CaseReport) -> Table {
    let mut table = stats_table();
    table.add_row(stats_row(Strategy::PrecisionSleep.label(), &report.precise));
    table.add_row(stats_row(Strategy::CoarseSleep.label(), &report.baseline));
    table
}

pub fn overall_table(precise: &RunningStats<f64>, baseline: &RunningStats<f64>) -> Table {
    let mut table = stats_table();
    table.add_row(stats_row(Strategy::PrecisionSleep.label(), precise));
    table.add_row(stats_row(Strategy::CoarseSleep.label(), baseline));
    table
}

fn check(ok: bool) -> ColoredString {
    if ok {
        "✓".green()
    } else {
        "✗".red()
    }
}

pub fn print_case(report: &CaseReport) {
    let verdict = if report.passed() {
        report.verdict().bold().green()
    } else {
        report.verdict().bold().red()
    };
    println!(
        "====================== {} microseconds ========= {}",
        report.case.offset_us, verdict
    );
    println!("{}", case_table(report));
    println!("   {} equal trial counts", check(report.counts_match));
    println!("   {} sleep_until_or_later never early", check(report.precise_never_early));
    println!("   {} thread::sleep never early", check(report.baseline_never_early));
    match report.improvement {
        Some(ratio) => println!("   {} minimum overshoot {:.1}x smaller", check(report.improvement_ok), ratio),
        None => println!("   {} minimum overshoot not comparable", check(false)),
    }
    if let Ok(median) = report.precise.median() {
        println!("   sleep_until_or_later was on or later at most by {:.3} µs (median)", median);
    }
    if let Ok(median) = report.baseline.median() {
        println!("   thread::sleep was on or later at most by {:.3} µs (median)", median);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{Criteria, TestCase};

    #[test]
    fn row_has_a_cell_per_header() {
        let stats: RunningStats<f64> = [1.0, 2.0, 4.0].into_iter().collect();
        let row = stats_row("x", &stats);
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[1], "3");
        assert_eq!(row[4], "2.000 µs");
    }

    #[test]
    fn empty_row_renders_na() {
        let row = stats_row("x", &RunningStats::new());
        assert_eq!(row[2], "n/a");
        assert_eq!(row[6], "n/a");
    }

    #[test]
    fn case_table_names_both_strategies() {
        let report = CaseReport::evaluate(
            TestCase::single(1023),
            [0.5, 0.7].into_iter().collect(),
            [55.0, 70.0].into_iter().collect(),
            &Criteria::default(),
        );
        let rendered = case_table(&report).to_string();
        assert!(rendered.contains("sleep_until_or_later"));
        assert!(rendered.contains("thread::sleep"));
    }
}

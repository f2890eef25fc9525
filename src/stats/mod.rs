//! Statistics for sleep accuracy measurements

pub mod running_stats;
pub mod trial_record;

pub use running_stats::{RunningStats, Sample, StatsError, StatsSummary};
pub use trial_record::TrialRecord;

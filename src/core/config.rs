use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bench::{Criteria, TestCase};
use crate::sleep::{PrecisionSleep, ReserveSchedule};

pub const SETTINGS_FILE: &str = "appsettings.json";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchmarkingParameters {
    /// Empty means the built-in cases
    #[serde(rename = "TestCases")]
    pub test_cases: Vec<TestCase>,
    /// Runs only `TestCase::single(value)` when set
    #[serde(rename = "CustomRequestUs")]
    pub custom_request_us: Option<u64>,
    #[serde(rename = "Trials", deserialize_with = "validate_positive_u32")]
    pub trials: u32,
    #[serde(rename = "BetterBy", deserialize_with = "validate_positive_f64")]
    pub better_by: f64,
    #[serde(rename = "EpsilonUs", deserialize_with = "validate_positive_f64")]
    pub epsilon_us: f64,
    #[serde(rename = "WarmupMs")]
    pub warmup_ms: u64,
    #[serde(rename = "Verbose")]
    pub verbose: bool,
    #[serde(rename = "SeriesTimeoutSecs", deserialize_with = "validate_positive_u64")]
    pub series_timeout_secs: u64,
    #[serde(rename = "ResultsFile")]
    pub results_file: Option<PathBuf>,
    #[serde(rename = "ReserveSchedule")]
    pub reserve_schedule: ReserveSchedule,
}

impl Default for BenchmarkingParameters {
    fn default() -> Self {
        Self {
            test_cases: Vec::new(),
            custom_request_us: None,
            trials: 10,
            better_by: 2.0,
            epsilon_us: 1.0,
            warmup_ms: 1000,
            verbose: false,
            series_timeout_secs: 120,
            results_file: Some(PathBuf::from("results.csv")),
            reserve_schedule: ReserveSchedule::default(),
        }
    }
}

impl BenchmarkingParameters {
    pub fn cases(&self) -> Vec<TestCase> {
        match self.custom_request_us {
            Some(offset) if offset > 0 => vec![TestCase::single(offset)],
            _ if self.test_cases.is_empty() => TestCase::builtin(),
            _ => self.test_cases.clone(),
        }
    }

    pub fn criteria(&self) -> Criteria {
        Criteria {
            better_by: self.better_by,
            epsilon_us: self.epsilon_us,
        }
    }

    pub fn precision_sleep(&self) -> PrecisionSleep {
        <PrecisionSleep>::default().with_schedule(self.reserve_schedule.clone())
    }

    pub fn series_timeout(&self) -> Duration {
        Duration::from_secs(self.series_timeout_secs)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

/// Load parameters from `path`; a missing file yields the defaults.
pub fn load_parameters(path: &Path) -> io::Result<BenchmarkingParameters> {
    match fs::read_to_string(path) {
        Ok(content) => parse_parameters(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("{} not found, using built-in parameters", path.display());
            Ok(BenchmarkingParameters::default())
        }
        Err(e) => Err(e),
    }
}

pub fn parse_parameters(content: &str) -> io::Result<BenchmarkingParameters> {
    serde_json::from_str::<BenchmarkingParameters>(content)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

pub(crate) fn validate_positive_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom("Value must be positive"))
    }
}

pub(crate) fn validate_positive_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = u32::deserialize(deserializer)?;
    if value > 0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom("Value must be positive"))
    }
}

pub(crate) fn validate_positive_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = u64::deserialize(deserializer)?;
    if value > 0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom("Value must be positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let params = parse_parameters("{}").unwrap();
        assert_eq!(params.trials, 10);
        assert_eq!(params.cases(), TestCase::builtin());
        assert_eq!(params.criteria(), Criteria::default());
        assert_eq!(params.reserve_schedule, ReserveSchedule::default());
    }

    #[test]
    fn custom_request_overrides_cases() {
        let params = parse_parameters(
            r#"{"CustomRequestUs": 5000, "TestCases": [{"OffsetUs": 10, "MultiplierUs": 2}]}"#,
        )
        .unwrap();
        assert_eq!(params.cases(), vec![TestCase::single(5000)]);
    }

    #[test]
    fn explicit_cases_are_used() {
        let params =
            parse_parameters(r#"{"TestCases": [{"OffsetUs": 10, "MultiplierUs": 2}]}"#).unwrap();
        assert_eq!(params.cases(), vec![TestCase::new(10, 2)]);
    }

    #[test]
    fn rejects_non_positive_values() {
        for bad in [
            r#"{"Trials": 0}"#,
            r#"{"BetterBy": -1.0}"#,
            r#"{"EpsilonUs": -0.5}"#,
            r#"{"EpsilonUs": 0.0}"#,
            r#"{"SeriesTimeoutSecs": 0}"#,
        ] {
            let err = parse_parameters(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData, "{}", bad);
        }
    }

    #[test]
    fn invalid_reserve_schedule_is_rejected() {
        let bad = r#"{"ReserveSchedule": {"Steps": [{"LogBelow": 5, "ReserveUs": 1}, {"LogBelow": 2, "ReserveUs": 10}], "FallbackUs": 100}}"#;
        assert_eq!(parse_parameters(bad).unwrap_err().kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let params = load_parameters(Path::new("does/not/exist/appsettings.json")).unwrap();
        assert_eq!(params.warmup(), Duration::from_secs(1));
    }
}

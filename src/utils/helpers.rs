//! Utility functions and helpers for sleep accuracy benchmarking
//!
//! Conversions between `Duration`, microsecond counts and display strings.

use std::io::{self, Error, ErrorKind};
use std::time::Duration;

/// Duration as fractional microseconds
#[inline]
pub fn micros_f64(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000.0
}

/// Narrow a generated request to the `u32` microsecond range the sleep accepts
pub fn request_micros(requested_us: u64) -> io::Result<u32> {
    u32::try_from(requested_us).map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("sleep request of {}us exceeds the supported range", requested_us),
        )
    })
}

/// Render an optional microsecond statistic for tables
pub fn format_micros(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3} µs", v),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_keeps_sub_microsecond_precision() {
        assert_eq!(micros_f64(Duration::from_nanos(1_500)), 1.5);
        assert_eq!(micros_f64(Duration::from_secs(1)), 1_000_000.0);
    }

    #[test]
    fn request_range_is_checked() {
        assert_eq!(request_micros(1023).unwrap(), 1023);
        let err = request_micros(u64::from(u32::MAX) + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn formats_missing_values() {
        assert_eq!(format_micros(Some(1.23456)), "1.235 µs");
        assert_eq!(format_micros(None), "n/a");
    }
}

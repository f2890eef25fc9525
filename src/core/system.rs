//! Host description printed ahead of a benchmark run

use lazy_static::lazy_static;
use serde::Serialize;
use std::sync::Mutex;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

#[derive(Debug, Clone, Serialize)]
pub struct SystemSummary {
    pub os: String,
    pub cpu_brand: String,
    pub logical_cpus: usize,
}

lazy_static! {
    static ref SYSTEM_SUMMARY: Mutex<Option<SystemSummary>> = Mutex::new(None);
}

/// Collect OS and CPU details once per process.
pub fn system_summary() -> SystemSummary {
    let mut cached = SYSTEM_SUMMARY
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(ref summary) = *cached {
        return summary.clone();
    }

    let sys = System::new_with_specifics(
        RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
    );
    let cpu_brand = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let summary = SystemSummary {
        os: os_info::get().to_string(),
        cpu_brand,
        logical_cpus: sys.cpus().len(),
    };
    log::debug!("system summary: {:?}", summary);

    *cached = Some(summary.clone());
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_cached() {
        let first = system_summary();
        let second = system_summary();
        assert_eq!(first.os, second.os);
        assert_eq!(first.cpu_brand, second.cpu_brand);
        assert!(!first.os.is_empty());
    }
}

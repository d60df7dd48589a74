//! Host cpu/memory sampling for the sensor node daemon
//!
//! Reads aggregate usage from `/proc/stat` and `/proc/meminfo`. Any parse
//! or I/O failure (including non-Linux hosts) falls back to 0.0 so a
//! missing metric never fails a publish.

use std::fs;

/// Aggregate CPU usage since boot, 0.0-100.0
pub fn cpu_usage() -> f32 {
    read_cpu_usage().unwrap_or(0.0)
}

/// Memory usage, 0.0-100.0
pub fn memory_usage() -> f32 {
    read_memory_usage().unwrap_or(0.0)
}

fn read_cpu_usage() -> Option<f32> {
    let stat = fs::read_to_string("/proc/stat").ok()?;
    let cpu_line = stat.lines().next()?;

    // "cpu  user nice system idle iowait irq softirq ..."
    let values: Vec<f64> = cpu_line
        .split_whitespace()
        .skip(1)
        .filter_map(|v| v.parse().ok())
        .collect();
    let total: f64 = values.iter().sum();
    let idle = *values.get(3)?;

    if total > 0.0 {
        Some((100.0 * (1.0 - idle / total)) as f32)
    } else {
        Some(0.0)
    }
}

fn read_memory_usage() -> Option<f32> {
    let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
    let total = meminfo_field(&meminfo, "MemTotal:")?;
    let free = meminfo_field(&meminfo, "MemAvailable:")
        .or_else(|| meminfo_field(&meminfo, "MemFree:"))?;

    if total > 0.0 {
        Some((100.0 * (1.0 - free / total)) as f32)
    } else {
        Some(0.0)
    }
}

fn meminfo_field(meminfo: &str, name: &str) -> Option<f64> {
    meminfo
        .lines()
        .find(|line| line.starts_with(name))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

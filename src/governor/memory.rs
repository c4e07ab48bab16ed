//! Resource inspector: RSS, virtual size, system-wide memory usage percent,
//! and CPU pressure, read from `/proc/self/status`, `/proc/meminfo`, and
//! `/proc/loadavg` (Linux); returns zeros on platforms without `/proc`,
//! matching the pool's best-effort stance on host introspection rather than
//! failing the monitoring loop.

use std::fs;

/// A point-in-time resource reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySample {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub system_percent: f64,
    /// 1-minute load average divided by core count, as a percentage.
    /// Cheap proxy for CPU pressure that avoids a blocking two-sample read.
    pub cpu_percent: f64,
}

/// Configured thresholds a [`MemorySample`] is compared against.
#[derive(Debug, Clone, Copy)]
pub struct MemoryThresholds {
    pub rss_bytes_ceiling: u64,
    pub system_percent_ceiling: f64,
    pub cpu_percent_ceiling: f64,
    /// Fraction (0.0-1.0) of pool capacity that counts as under pressure.
    pub pool_utilization_fraction: f64,
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            rss_bytes_ceiling: 2 * 1024 * 1024 * 1024,
            system_percent_ceiling: 90.0,
            cpu_percent_ceiling: 90.0,
            pool_utilization_fraction: 0.9,
        }
    }
}

/// Read the current process's RSS/virtual size, system-wide memory percent,
/// and load-average-derived CPU percent. Best-effort: any parse failure
/// yields zeros for that field.
#[must_use]
pub fn sample() -> MemorySample {
    let (rss_bytes, virtual_bytes) = read_self_status();
    let system_percent = read_system_percent();
    let cpu_percent = read_cpu_percent();
    MemorySample {
        rss_bytes,
        virtual_bytes,
        system_percent,
        cpu_percent,
    }
}

fn read_self_status() -> (u64, u64) {
    let Ok(contents) = fs::read_to_string("/proc/self/status") else {
        return (0, 0);
    };
    let mut rss = 0;
    let mut vsize = 0;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            rss = parse_kb_field(rest);
        } else if let Some(rest) = line.strip_prefix("VmSize:") {
            vsize = parse_kb_field(rest);
        }
    }
    (rss, vsize)
}

fn parse_kb_field(rest: &str) -> u64 {
    rest.split_whitespace()
        .next()
        .and_then(|n| n.parse::<u64>().ok())
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}

fn read_system_percent() -> f64 {
    let Ok(contents) = fs::read_to_string("/proc/meminfo") else {
        return 0.0;
    };
    let mut total = 0u64;
    let mut available = 0u64;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = parse_kb_field(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = parse_kb_field(rest);
        }
    }
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(available) as f64;
    (used / total as f64) * 100.0
}

fn read_cpu_percent() -> f64 {
    let Ok(contents) = fs::read_to_string("/proc/loadavg") else {
        return 0.0;
    };
    let Some(one_minute) = contents.split_whitespace().next() else {
        return 0.0;
    };
    let Ok(load) = one_minute.parse::<f64>() else {
        return 0.0;
    };
    let cores = num_cpus::get().max(1) as f64;
    ((load / cores) * 100.0).min(100.0)
}

impl MemorySample {
    #[must_use]
    pub fn exceeds(&self, thresholds: &MemoryThresholds) -> bool {
        self.rss_bytes > thresholds.rss_bytes_ceiling
            || self.system_percent > thresholds.system_percent_ceiling
            || self.cpu_percent > thresholds.cpu_percent_ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_never_panics_and_is_non_negative() {
        let s = sample();
        assert!(s.system_percent >= 0.0);
        assert!(s.cpu_percent >= 0.0);
    }

    #[test]
    fn exceeds_respects_thresholds() {
        let thresholds = MemoryThresholds {
            rss_bytes_ceiling: 100,
            system_percent_ceiling: 50.0,
            cpu_percent_ceiling: 50.0,
            pool_utilization_fraction: 0.9,
        };
        let over = MemorySample {
            rss_bytes: 200,
            virtual_bytes: 0,
            system_percent: 10.0,
            cpu_percent: 10.0,
        };
        assert!(over.exceeds(&thresholds));
        let under = MemorySample {
            rss_bytes: 10,
            virtual_bytes: 0,
            system_percent: 10.0,
            cpu_percent: 10.0,
        };
        assert!(!under.exceeds(&thresholds));
    }

    #[test]
    fn cpu_percent_exceeds_triggers_independently_of_memory() {
        let thresholds = MemoryThresholds {
            rss_bytes_ceiling: u64::MAX,
            system_percent_ceiling: 100.0,
            cpu_percent_ceiling: 50.0,
            pool_utilization_fraction: 0.9,
        };
        let hot_cpu = MemorySample {
            rss_bytes: 0,
            virtual_bytes: 0,
            system_percent: 0.0,
            cpu_percent: 90.0,
        };
        assert!(hot_cpu.exceeds(&thresholds));
    }
}

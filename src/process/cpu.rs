//! CPU statistics parsing for process metrics.
//!
//! This module reads accumulated CPU time and start time from
//! `/proc/<pid>/stat` and turns them into the lifetime-normalised
//! percentage that process accounting tools such as `ps` report.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{ProcWatchError, Result};
use crate::procfs::{stat_fields, ProcFs};

// Indices into the fields following the command name (field 3 = index 0).
const UTIME_IDX: usize = 11;
const STIME_IDX: usize = 12;
const STARTTIME_IDX: usize = 19;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    // SAFETY: sysconf is safe to call with _SC_CLK_TCK
    // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
    let tck = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if tck > 0 {
        return tck as f64;
    }
    100.0
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Instantaneous CPU utilisation of a single process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    pub percentage: f32,
}

/// Times extracted from `/proc/<pid>/stat`, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
}

/// Parses utime, stime and starttime from stat content.
pub fn parse_cpu_times(content: &str) -> Option<CpuTimes> {
    let fields = stat_fields(content)?;
    let field = |idx: usize| fields.get(idx).and_then(|s| s.parse::<u64>().ok());

    Some(CpuTimes {
        utime: field(UTIME_IDX)?,
        stime: field(STIME_IDX)?,
        starttime: field(STARTTIME_IDX)?,
    })
}

/// Percentage of one CPU used over the process lifetime.
pub fn lifetime_percent(times: CpuTimes, uptime_seconds: f64, clk_tck: f64) -> f32 {
    let cpu_seconds = (times.utime + times.stime) as f64 / clk_tck;
    let elapsed = uptime_seconds - times.starttime as f64 / clk_tck;
    if elapsed <= 0.0 {
        return 0.0;
    }
    ((cpu_seconds / elapsed) * 100.0).max(0.0) as f32
}

/// Samples the CPU percentage of `pid` once, without smoothing.
pub fn cpu_usage(procfs: &ProcFs, pid: u32) -> Result<CpuUsage> {
    let content = procfs.read_pid_file(pid, "stat")?;
    let times = parse_cpu_times(&content).ok_or(ProcWatchError::EmptyMeasurement { pid })?;
    let uptime = procfs.read_uptime()?;

    Ok(CpuUsage {
        percentage: lifetime_percent(times, uptime, *CLK_TCK),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    // pid (comm) state ppid pgrp session tty_nr tpgid flags minflt cminflt majflt cmajflt utime stime ...
    const STAT: &str = "1234 (test_process) S 1 1234 1234 0 -1 4194304 100 0 0 0 1000 500 0 0 20 0 1 0 12345 12345678 1234 18446744073709551615";

    #[test]
    fn test_parse_cpu_times() {
        let times = parse_cpu_times(STAT).expect("times");
        assert_eq!(
            times,
            CpuTimes {
                utime: 1000,
                stime: 500,
                starttime: 12345
            }
        );
    }

    #[test]
    fn test_parse_cpu_times_truncated() {
        assert!(parse_cpu_times("1234 (test) S 1 2 3").is_none());
        assert!(parse_cpu_times("").is_none());
    }

    #[test]
    fn test_lifetime_percent() {
        let times = CpuTimes {
            utime: 1000,
            stime: 500,
            starttime: 1000,
        };
        // 15 s of CPU over (40 - 10) s of lifetime
        let pct = lifetime_percent(times, 40.0, 100.0);
        assert!((pct - 50.0).abs() < 0.001, "got {pct}");
    }

    #[test]
    fn test_lifetime_percent_not_started_yet() {
        let times = CpuTimes {
            utime: 10,
            stime: 0,
            starttime: 5000,
        };
        assert_eq!(lifetime_percent(times, 10.0, 100.0), 0.0);
    }

    #[test]
    fn test_cpu_usage_from_synthetic_proc() {
        let dir = tempdir().expect("Failed to create temp dir");
        let pid_dir = dir.path().join("1234");
        fs::create_dir(&pid_dir).expect("Failed to create pid dir");
        fs::write(pid_dir.join("stat"), STAT).expect("Failed to write stat");

        let uptime = 12345.0 / *CLK_TCK + 30.0;
        fs::write(dir.path().join("uptime"), format!("{uptime:.2} 0.00\n"))
            .expect("Failed to write uptime");

        let usage = cpu_usage(&ProcFs::new(dir.path()), 1234).expect("cpu");
        let expected = (1500.0 / *CLK_TCK) / 30.0 * 100.0;
        assert!(
            (usage.percentage as f64 - expected).abs() < 0.1,
            "Expected ~{:.3}, got {:.3}",
            expected,
            usage.percentage
        );
    }

    #[test]
    fn test_cpu_usage_empty_stat() {
        let dir = tempdir().expect("Failed to create temp dir");
        let pid_dir = dir.path().join("7");
        fs::create_dir(&pid_dir).expect("Failed to create pid dir");
        fs::write(pid_dir.join("stat"), "").expect("Failed to write stat");

        let result = cpu_usage(&ProcFs::new(dir.path()), 7);
        assert!(matches!(result, Err(ProcWatchError::EmptyMeasurement { pid: 7 })));
    }

    #[test]
    fn test_cpu_usage_missing_pid() {
        let dir = tempdir().expect("Failed to create temp dir");
        let result = cpu_usage(&ProcFs::new(dir.path()), 7);
        assert!(matches!(result, Err(ProcWatchError::ProcessNotFound { pid: 7 })));
    }
}

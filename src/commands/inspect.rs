//! One-shot inspection commands: `status`, `stats` and `children`.

use anyhow::Context;
use herakles_proc_watch::{ProcessHandle, ProcessStats, ProcessStatus};
use serde::Serialize;

use crate::config::Config;

/// Status output record, including the liveness probe result.
#[derive(Debug, Serialize)]
struct StatusReport {
    pid: u32,
    running: bool,
    #[serde(flatten)]
    status: ProcessStatus,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    pid: u32,
    #[serde(flatten)]
    stats: ProcessStats,
}

#[derive(Debug, Serialize)]
struct ChildrenReport {
    pid: u32,
    children: Vec<u32>,
}

fn open(pid: u32, config: &Config) -> anyhow::Result<ProcessHandle> {
    ProcessHandle::open_with(config.procfs(), pid, config.retry_policy())
        .with_context(|| format!("Failed to open process {}", pid))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints name, state, virtual memory and liveness of `pid`.
pub fn command_status(pid: u32, config: &Config) -> anyhow::Result<()> {
    let mut handle = open(pid, config)?;
    let status = handle
        .status()
        .with_context(|| format!("Failed to read status of {}", pid))?;
    let running = handle.is_running()?;

    if config.json_output() {
        return print_json(&StatusReport {
            pid,
            running,
            status,
        });
    }

    println!("PID:      {}", pid);
    println!("Name:     {}", status.name);
    println!("Running:  {}", if running { "yes" } else { "no" });
    if let Some(state) = &status.state {
        println!("State:    {}", state);
    }
    if let Some(ppid) = status.ppid {
        println!("PPid:     {}", ppid);
    }
    if let Some(threads) = status.threads {
        println!("Threads:  {}", threads);
    }
    println!("VmSize:   {} kB", status.vm_size_kb);
    match status.vm_peak_kb {
        Some(peak) => println!("VmPeak:   {} kB", peak),
        None => println!("VmPeak:   n/a"),
    }
    if let Some(rss) = status.vm_rss_kb {
        println!("VmRSS:    {} kB", rss);
    }
    if let Some(swap) = status.vm_swap_kb {
        println!("VmSwap:   {} kB", swap);
    }
    Ok(())
}

/// Takes a single memory + CPU sample of `pid` and its direct children.
pub fn command_stats(pid: u32, config: &Config) -> anyhow::Result<()> {
    let handle = open(pid, config)?;
    let stats = handle
        .stats()
        .with_context(|| format!("Failed to sample process {}", pid))?;

    if config.json_output() {
        return print_json(&StatsReport { pid, stats });
    }

    println!("PID:        {}", pid);
    println!("RSS:        {} kB", stats.memory.rss_kb);
    println!("Swap:       {} kB", stats.memory.swap_kb());
    println!("RSS+Swap:   {} kB", stats.memory.rss_swap_kb);
    println!("CPU:        {:.1}%", stats.cpu.percentage);
    Ok(())
}

/// Lists the direct children of `pid`.
pub fn command_children(pid: u32, config: &Config) -> anyhow::Result<()> {
    let handle = open(pid, config)?;
    let children = handle
        .children_pids()
        .with_context(|| format!("Failed to list children of {}", pid))?;

    if config.json_output() {
        return print_json(&ChildrenReport { pid, children });
    }

    if children.is_empty() {
        println!("Process {} has no children", pid);
    } else {
        for child in children {
            println!("{}", child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_report_flattens_status() {
        let report = StatusReport {
            pid: 7,
            running: true,
            status: ProcessStatus {
                name: "worker".into(),
                vm_size_kb: 2048,
                vm_peak_kb: None,
                vm_rss_kb: Some(512),
                vm_swap_kb: None,
                state: Some("S (sleeping)".into()),
                ppid: Some(1),
                threads: Some(4),
            },
        };

        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["pid"], 7);
        assert_eq!(value["running"], true);
        assert_eq!(value["name"], "worker");
        assert_eq!(value["vm_size_kb"], 2048);
        assert!(value["vm_peak_kb"].is_null());
    }

    #[test]
    fn test_stats_report_shape() {
        let report = StatsReport {
            pid: 9,
            stats: ProcessStats::default(),
        };
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["memory"]["rss_kb"], 0);
        assert!(value["cpu"]["percentage"].is_number());
    }
}

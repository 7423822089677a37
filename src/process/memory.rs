//! Memory parsing utilities for reading process memory metrics from /proc.
//!
//! This module sums `Rss` and `Swap` from `/proc/<pid>/smaps_rollup` (or the
//! full `/proc/<pid>/smaps` on older kernels) over a process and its direct
//! children.

use serde::Serialize;
use std::fs;
use std::io::{BufRead, BufReader};
use tracing::debug;

use crate::error::{ProcWatchError, Result};
use crate::process::children::children;
use crate::process::status::parse_kb_field;
use crate::procfs::ProcFs;

/// Read buffer for smaps files. Full smaps of a large process can be several
/// hundred kB; rollup is a few lines.
const SMAPS_BUFFER_KB: usize = 64;

/// Resident and resident+swap memory of a process tree, in kB.
///
/// `rss_swap_kb` is always `rss_kb` plus the independently summed swap, so
/// `rss_swap_kb >= rss_kb` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub rss_kb: u64,
    pub rss_swap_kb: u64,
}

impl MemoryUsage {
    pub fn from_totals(totals: MapTotals) -> Self {
        Self {
            rss_kb: totals.rss_kb,
            rss_swap_kb: totals.rss_kb + totals.swap_kb,
        }
    }

    /// Swapped-out part of the footprint.
    pub fn swap_kb(&self) -> u64 {
        self.rss_swap_kb.saturating_sub(self.rss_kb)
    }
}

/// Raw sums from one memory-map source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapTotals {
    pub rss_kb: u64,
    pub swap_kb: u64,
}

impl std::ops::AddAssign for MapTotals {
    fn add_assign(&mut self, other: Self) {
        self.rss_kb += other.rss_kb;
        self.swap_kb += other.swap_kb;
    }
}

/// Sums the rss and swap lines of a memory-map source.
///
/// A line counts towards rss when its field name begins with `rss`, and
/// towards swap when it begins with `swap` (both case-insensitive), so
/// `SwapPss` is summed along with `Swap`. Mapping header lines and
/// unparsable values are skipped.
pub fn parse_memory_map<R: BufRead>(reader: R) -> std::io::Result<MapTotals> {
    let mut totals = MapTotals::default();

    for line in reader.lines() {
        let l = line?;
        let Some((key, value)) = l.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if key.starts_with("rss") {
            totals.rss_kb += parse_kb_field(value).unwrap_or(0);
        } else if key.starts_with("swap") {
            totals.swap_kb += parse_kb_field(value).unwrap_or(0);
        }
    }

    Ok(totals)
}

/// Reads the memory-map totals of a single process.
///
/// Uses `smaps_rollup` when available (Linux >= 4.14), otherwise falls back
/// to the full `smaps`.
pub fn read_memory_map(procfs: &ProcFs, pid: u32) -> Result<MapTotals> {
    let rollup = procfs.pid_file(pid, "smaps_rollup");
    let path = if rollup.exists() {
        rollup
    } else {
        procfs.pid_file(pid, "smaps")
    };

    let file = fs::File::open(&path).map_err(|e| ProcWatchError::from_proc_io(pid, "smaps", e))?;
    let reader = BufReader::with_capacity(SMAPS_BUFFER_KB * 1024, file);
    parse_memory_map(reader).map_err(|e| ProcWatchError::from_proc_io(pid, "smaps", e))
}

/// Aggregates memory over `pid` and its direct children.
///
/// The target's own memory map must be readable. A child that exits or
/// cannot be read mid-scan contributes zero; grandchildren are not visited.
pub fn memory_usage(procfs: &ProcFs, pid: u32) -> Result<MemoryUsage> {
    let mut totals = read_memory_map(procfs, pid)?;

    for child in children(procfs, pid)? {
        match read_memory_map(procfs, child) {
            Ok(child_totals) => totals += child_totals,
            Err(e) => debug!("Skipping child {} of pid {}: {}", child, pid, e),
        }
    }

    Ok(MemoryUsage::from_totals(totals))
}

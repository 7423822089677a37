//! Direct child discovery.
//!
//! The kernel lists the children spawned by each thread in
//! `/proc/<pid>/task/<tid>/children` (requires `CONFIG_PROC_CHILDREN`).
//! Without that file we fall back to scanning every `/proc/<n>/stat` for a
//! matching ppid.

use std::fs;
use tracing::debug;

use crate::error::{ProcWatchError, Result};
use crate::procfs::{stat_fields, ProcFs};

/// Returns the direct children of `pid`, sorted and deduplicated.
///
/// A pid without children, or one that has already exited, yields an empty
/// vector. Only a failure to list the process table itself is an error.
pub fn children(procfs: &ProcFs, pid: u32) -> Result<Vec<u32>> {
    if !procfs.pid_dir(pid).exists() && procfs.root().is_dir() {
        debug!("Pid {} has exited, no children to list", pid);
        return Ok(Vec::new());
    }

    let mut out = match children_from_tasks(procfs, pid) {
        Some(found) => found,
        None => scan_children(procfs, pid)?,
    };
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// Reads `task/*/children` for every thread of `pid`.
///
/// Returns `None` when the per-thread children files are not available.
fn children_from_tasks(procfs: &ProcFs, pid: u32) -> Option<Vec<u32>> {
    let task_dir = procfs.pid_file(pid, "task");
    let entries = fs::read_dir(&task_dir).ok()?;

    let mut out = Vec::new();
    let mut any_file = false;
    for entry in entries.flatten() {
        let Ok(contents) = fs::read_to_string(entry.path().join("children")) else {
            continue;
        };
        any_file = true;
        out.extend(
            contents
                .split_whitespace()
                .filter_map(|s| s.parse::<u32>().ok()),
        );
    }

    if any_file {
        Some(out)
    } else {
        debug!("No task children files for pid {}, scanning process table", pid);
        None
    }
}

/// Scans every process under the root for `ppid == pid`.
fn scan_children(procfs: &ProcFs, ppid: u32) -> Result<Vec<u32>> {
    let pids = procfs
        .pids()
        .map_err(|source| ProcWatchError::Enumeration { pid: ppid, source })?;

    let mut out = Vec::new();
    for candidate in pids {
        let Ok(stat) = fs::read_to_string(procfs.pid_file(candidate, "stat")) else {
            continue;
        };
        let parent = stat_fields(&stat)
            .and_then(|fields| fields.get(1).and_then(|s| s.parse::<u32>().ok()));
        if parent == Some(ppid) {
            out.push(candidate);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_stat(root: &Path, pid: u32, ppid: u32) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).expect("Failed to create pid dir");
        let content = format!("{pid} (proc {pid}) S {ppid} {pid} {pid} 0 -1 4194304 0 0 0 0 0 0");
        fs::write(dir.join("stat"), content).expect("Failed to write stat");
    }

    fn write_task_children(root: &Path, pid: u32, tid: u32, children: &str) {
        let dir = root.join(pid.to_string()).join("task").join(tid.to_string());
        fs::create_dir_all(&dir).expect("Failed to create task dir");
        fs::write(dir.join("children"), children).expect("Failed to write children");
    }

    #[test]
    fn test_children_from_task_files_across_threads() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_task_children(dir.path(), 100, 100, "201 202 ");
        write_task_children(dir.path(), 100, 101, "203 201");

        let found = children(&ProcFs::new(dir.path()), 100).expect("children");
        assert_eq!(found, vec![201, 202, 203]);
    }

    #[test]
    fn test_no_children_is_empty() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_task_children(dir.path(), 100, 100, "");

        let found = children(&ProcFs::new(dir.path()), 100).expect("children");
        assert!(found.is_empty());
    }

    #[test]
    fn test_fallback_scan_by_ppid() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_stat(dir.path(), 100, 1);
        write_stat(dir.path(), 201, 100);
        write_stat(dir.path(), 202, 100);
        write_stat(dir.path(), 301, 201); // grandchild, excluded

        let found = children(&ProcFs::new(dir.path()), 100).expect("children");
        assert_eq!(found, vec![201, 202]);
    }

    #[test]
    fn test_missing_pid_is_empty() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_stat(dir.path(), 1, 0);

        let found = children(&ProcFs::new(dir.path()), 4242).expect("children");
        assert!(found.is_empty());
    }

    #[test]
    fn test_exited_pid_does_not_scan_process_table() {
        let dir = tempdir().expect("Failed to create temp dir");
        // A leftover entry still naming 4242 as parent must not be picked up.
        write_stat(dir.path(), 501, 4242);

        let found = children(&ProcFs::new(dir.path()), 4242).expect("children");
        assert!(found.is_empty());
    }

    #[test]
    fn test_unreadable_proc_root_is_enumeration_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let procfs = ProcFs::new(dir.path().join("does-not-exist"));

        let result = children(&procfs, 1);
        assert!(matches!(result, Err(ProcWatchError::Enumeration { pid: 1, .. })));
    }
}

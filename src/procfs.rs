//! Access to the process pseudo-filesystem.
//!
//! All readers take a [`ProcFs`] instead of hard-coding `/proc`, so the
//! parsers can run against synthetic trees in tests or a host `/proc`
//! bind-mounted elsewhere inside a container.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProcWatchError, Result};

/// Default mount point of the process pseudo-filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Root of a process pseudo-filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<pid>`
    pub fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    /// `<root>/<pid>/<file>`
    pub fn pid_file(&self, pid: u32, file: &str) -> PathBuf {
        self.pid_dir(pid).join(file)
    }

    /// Reads a per-pid file, mapping failures onto the error taxonomy.
    pub fn read_pid_file(&self, pid: u32, file: &'static str) -> Result<String> {
        fs::read_to_string(self.pid_file(pid, file))
            .map_err(|e| ProcWatchError::from_proc_io(pid, file, e))
    }

    /// Lists numeric entries (pids) under the root.
    pub fn pids(&self) -> std::io::Result<Vec<u32>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)?.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if let Ok(pid) = name.parse::<u32>() {
                out.push(pid);
            }
        }
        Ok(out)
    }

    /// Reads system uptime in seconds from `<root>/uptime`.
    ///
    /// Format: "12345.67 54321.00"
    pub fn read_uptime(&self) -> Result<f64> {
        let path = self.root.join("uptime");
        let content = fs::read_to_string(&path).map_err(|source| ProcWatchError::Io {
            path: path.clone(),
            source,
        })?;

        content
            .split_whitespace()
            .next()
            .ok_or_else(|| ProcWatchError::parse("uptime", "no fields found"))?
            .parse::<f64>()
            .map_err(|e| ProcWatchError::parse("uptime", e.to_string()))
    }
}

/// Splits `/proc/<pid>/stat` into the fields that follow the command name.
///
/// The command name is wrapped in parentheses and may itself contain spaces
/// or parentheses, so the split happens after the *last* `)`. Index 0 of the
/// result is the state code (field 3 in proc(5)), index 1 the ppid (field 4).
pub fn stat_fields(content: &str) -> Option<Vec<&str>> {
    let end = content.rfind(')')?;
    let rest = content.get(end + 1..)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

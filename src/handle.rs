//! Long-lived handle bound to one process.
//!
//! The handle opens `/proc/<pid>/status` once and re-reads it on every
//! status query. Memory, CPU and child queries go straight to the
//! corresponding `/proc` readers.

use std::fs::File;
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{ProcWatchError, Result};
use crate::process::status::{parse_status, read_status_text};
use crate::process::{self, CpuUsage, MemoryUsage, ProcessState, ProcessStats, ProcessStatus};
use crate::procfs::ProcFs;
use crate::stream::{StatsSampler, StatsStream};

pub const DEFAULT_OPEN_DEADLINE: Duration = Duration::from_secs(5);
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(10);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_millis(500);

/// Bounded retry schedule used while waiting for a process to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Give up with `ProcessNotFound` once this much time has passed.
    pub deadline: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_OPEN_DEADLINE,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Self::default()
        }
    }
}

/// A process under observation.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    procfs: ProcFs,
    status_file: File,
}

impl ProcessHandle {
    /// Opens a handle on the host `/proc`, waiting up to `deadline` for the
    /// process to appear.
    pub fn open(pid: u32, deadline: Duration) -> Result<Self> {
        Self::open_with(ProcFs::default(), pid, RetryPolicy::with_deadline(deadline))
    }

    /// Opens a handle under an explicit proc root and retry policy.
    ///
    /// The status file is retried with exponential backoff until it opens or
    /// the deadline passes. A permission error is returned immediately since
    /// retrying cannot fix it.
    pub fn open_with(procfs: ProcFs, pid: u32, policy: RetryPolicy) -> Result<Self> {
        if pid == 0 {
            return Err(ProcWatchError::InvalidConfiguration(
                "pid must be greater than zero".into(),
            ));
        }

        let path = procfs.pid_file(pid, "status");
        let start = Instant::now();
        let min_backoff = Duration::from_millis(1);
        let mut backoff = policy.initial_backoff.max(min_backoff);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let err = match File::open(&path) {
                Ok(status_file) => {
                    debug!("Opened {} after {} attempt(s)", path.display(), attempt);
                    return Ok(Self {
                        pid,
                        procfs,
                        status_file,
                    });
                }
                Err(e) => e,
            };

            if err.kind() == io::ErrorKind::PermissionDenied {
                return Err(ProcWatchError::PermissionDenied { pid });
            }

            let elapsed = start.elapsed();
            if elapsed >= policy.deadline {
                debug!(
                    "Giving up on pid {} after {} attempt(s) in {:?}: {}",
                    pid, attempt, elapsed, err
                );
                return Err(ProcWatchError::ProcessNotFound { pid });
            }

            let wait = backoff.min(policy.deadline - elapsed);
            debug!(
                "Status for pid {} not available ({}), retrying in {:?}",
                pid, err, wait
            );
            thread::sleep(wait);
            backoff = (backoff * 2).min(policy.max_backoff).max(min_backoff);
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn procfs(&self) -> &ProcFs {
        &self.procfs
    }

    /// Re-reads the status file from the start.
    pub fn status(&mut self) -> Result<ProcessStatus> {
        let content = read_status_text(&mut self.status_file)
            .map_err(|e| ProcWatchError::from_proc_io(self.pid, "status", e))?;
        ProcessStatus::from_map(&parse_status(&content)?)
    }

    pub fn name(&mut self) -> Result<String> {
        Ok(self.status()?.name)
    }

    /// Peak virtual memory in kB; `None` when the kernel reports no `VmPeak`.
    pub fn peak_memory(&mut self) -> Result<Option<u64>> {
        Ok(self.status()?.vm_peak_kb)
    }

    pub fn state(&self) -> Result<ProcessState> {
        process::process_state(&self.procfs, self.pid)
    }

    pub fn is_running(&self) -> Result<bool> {
        process::is_running(self.pid)
    }

    pub fn children_pids(&self) -> Result<Vec<u32>> {
        process::children(&self.procfs, self.pid)
    }

    pub fn memory_usage(&self) -> Result<MemoryUsage> {
        process::memory_usage(&self.procfs, self.pid)
    }

    pub fn cpu_usage(&self) -> Result<CpuUsage> {
        process::cpu_usage(&self.procfs, self.pid)
    }

    /// Memory first, then CPU.
    pub fn stats(&self) -> Result<ProcessStats> {
        self.sampler().sample()
    }

    /// The sampling half of this handle. It does not share the status file.
    pub fn sampler(&self) -> StatsSampler {
        StatsSampler::new(self.procfs.clone(), self.pid)
    }

    /// Starts a background stream of samples every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch_stats(&self, interval: Duration) -> Result<StatsStream> {
        let mut stream = StatsStream::new(self.sampler(), interval)?;
        stream.start()?;
        Ok(stream)
    }
}

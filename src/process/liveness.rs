//! Liveness probing and scheduler state.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::Serialize;
use std::fmt;

use crate::error::{ProcWatchError, Result};
use crate::procfs::{stat_fields, ProcFs};

/// Kernel scheduling state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessState {
    /// `R`
    Running,
    /// `S`
    Sleeping,
    /// `Z`
    Zombie,
    /// `D`
    UninterruptibleWait,
    /// `T`
    Stopped,
    /// `t`
    TracingStop,
    /// `I`
    Idle,
    /// `X` / `x`
    Dead,
}

impl ProcessState {
    /// Maps a one-letter kernel state code. Unknown codes are a parse error.
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "R" => Ok(Self::Running),
            "S" => Ok(Self::Sleeping),
            "Z" => Ok(Self::Zombie),
            "D" => Ok(Self::UninterruptibleWait),
            "T" => Ok(Self::Stopped),
            "t" => Ok(Self::TracingStop),
            "I" => Ok(Self::Idle),
            "X" | "x" => Ok(Self::Dead),
            other => Err(ProcWatchError::parse(
                "process state",
                format!("unrecognized state code {other:?}"),
            )),
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::Running => 'R',
            Self::Sleeping => 'S',
            Self::Zombie => 'Z',
            Self::UninterruptibleWait => 'D',
            Self::Stopped => 'T',
            Self::TracingStop => 't',
            Self::Idle => 'I',
            Self::Dead => 'X',
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Zombie => "zombie",
            Self::UninterruptibleWait => "uninterruptible wait",
            Self::Stopped => "stopped",
            Self::TracingStop => "tracing stop",
            Self::Idle => "idle",
            Self::Dead => "dead",
        };
        write!(f, "{} ({})", self.code(), name)
    }
}

fn to_nix_pid(pid: u32) -> Result<Pid> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(ProcWatchError::InvalidConfiguration(format!(
            "invalid pid {pid}"
        ))),
    }
}

/// Probes `pid` with signal 0.
///
/// A process we may not signal (`EPERM`) is still alive. `ESRCH` means it is
/// gone; any other errno is returned as `Os`. A zombie still answers the
/// probe until its parent reaps it.
pub fn is_running(pid: u32) -> Result<bool> {
    match kill(to_nix_pid(pid)?, None) {
        Ok(()) => Ok(true),
        Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(ProcWatchError::Os { pid, source }),
    }
}

/// Reads the scheduler state code from `/proc/<pid>/stat`.
pub fn process_state(procfs: &ProcFs, pid: u32) -> Result<ProcessState> {
    let content = procfs.read_pid_file(pid, "stat")?;
    let fields = stat_fields(&content)
        .ok_or_else(|| ProcWatchError::parse("stat", format!("truncated stat for pid {pid}")))?;
    ProcessState::from_code(fields[0])
}

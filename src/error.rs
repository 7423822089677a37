//! Error taxonomy for process observation.
//!
//! Every library operation returns [`Result`]. Variants are kept distinct so
//! callers can tell a vanished process apart from malformed kernel data or a
//! refused read.

use std::io;
use std::path::PathBuf;

/// Errors produced while observing a process.
#[derive(Debug, thiserror::Error)]
pub enum ProcWatchError {
    #[error("process {pid} not found")]
    ProcessNotFound { pid: u32 },

    #[error("permission denied while accessing process {pid}")]
    PermissionDenied { pid: u32 },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("{what} unavailable for process {pid}: {source}")]
    ResourceUnavailable {
        pid: u32,
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to enumerate children of process {pid}: {source}")]
    Enumeration {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no CPU measurement available for process {pid}")]
    EmptyMeasurement { pid: u32 },

    #[error("OS error probing process {pid}: {source}")]
    Os {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("sampling task for process {pid} failed: {detail}")]
    SampleTask { pid: u32, detail: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProcWatchError {
    pub(crate) fn parse(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            detail: detail.into(),
        }
    }

    /// True when the error means the process is gone (or never existed).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProcessNotFound { .. })
    }

    /// Maps an I/O error from a per-pid `/proc` file onto the taxonomy.
    ///
    /// `ENOENT` and `ESRCH` (returned by some files of an exiting process)
    /// both mean the process is gone; `EACCES`/`EPERM` mean it is alive but
    /// not ours to read. Anything else is reported as `ResourceUnavailable`.
    pub(crate) fn from_proc_io(pid: u32, what: &'static str, err: io::Error) -> Self {
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Self::ProcessNotFound { pid };
        }
        match err.kind() {
            io::ErrorKind::NotFound => Self::ProcessNotFound { pid },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { pid },
            _ => Self::ResourceUnavailable {
                pid,
                what,
                source: err,
            },
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ProcWatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_proc_io_not_found() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        let mapped = ProcWatchError::from_proc_io(42, "status", err);
        assert!(mapped.is_not_found());
    }

    #[test]
    fn test_from_proc_io_esrch_is_not_found() {
        let err = io::Error::from_raw_os_error(libc::ESRCH);
        let mapped = ProcWatchError::from_proc_io(42, "smaps", err);
        assert!(matches!(mapped, ProcWatchError::ProcessNotFound { pid: 42 }));
    }

    #[test]
    fn test_from_proc_io_permission_denied() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        let mapped = ProcWatchError::from_proc_io(7, "smaps", err);
        assert!(matches!(mapped, ProcWatchError::PermissionDenied { pid: 7 }));
    }

    #[test]
    fn test_from_proc_io_other_is_resource_unavailable() {
        let err = io::Error::other("boom");
        let mapped = ProcWatchError::from_proc_io(7, "smaps", err);
        assert!(matches!(
            mapped,
            ProcWatchError::ResourceUnavailable { pid: 7, what: "smaps", .. }
        ));
        assert!(mapped.to_string().contains("smaps unavailable for process 7"));
    }
}

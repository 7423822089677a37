//! Herakles Process Watch Library
//!
//! This library observes a running Linux process and its direct children
//! through `/proc`: liveness, identity, resident and swapped memory, and CPU
//! usage, either on demand or as a periodic stream of samples.
//!
//! # Features
//!
//! - **Status Parsing**: Re-reads `/proc/<pid>/status` through one long-lived handle
//! - **Tree Memory**: Sums `Rss`/`Swap` over a process and its direct children
//! - **CPU Sampling**: Lifetime-normalised CPU percentage from `/proc/<pid>/stat`
//! - **Liveness**: Signal-0 probing and scheduler state
//! - **Streaming**: Cancellable background sampling on tokio
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_proc_watch::ProcessHandle;
//! use std::time::Duration;
//!
//! # async fn demo() -> herakles_proc_watch::Result<()> {
//! // Wait up to 2 seconds for the process to show up
//! let mut handle = ProcessHandle::open(std::process::id(), Duration::from_secs(2))?;
//!
//! let status = handle.status()?;
//! println!("{} uses {} kB of virtual memory", status.name, status.vm_size_kb);
//!
//! let mut stream = handle.watch_stats(Duration::from_millis(500))?;
//! while let Some(sample) = stream.next().await {
//!     let stats = sample?;
//!     println!("rss={} kB cpu={:.1}%", stats.memory.rss_kb, stats.cpu.percentage);
//!     # break;
//! }
//! stream.cancel().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handle;
pub mod process;
pub mod procfs;
pub mod stream;

// Re-export main types for convenience
pub use error::{ProcWatchError, Result};
pub use handle::{ProcessHandle, RetryPolicy};
pub use process::{CpuUsage, MemoryUsage, ProcessState, ProcessStats, ProcessStatus};
pub use procfs::ProcFs;
pub use stream::{StatsSampler, StatsStream, StreamState};

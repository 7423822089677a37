//! Process-related modules for status, memory, CPU and liveness.
//!
//! This module provides:
//! - `status`: Parsing of /proc/<pid>/status
//! - `children`: Direct child discovery
//! - `memory`: RSS/swap aggregation from /proc/<pid>/smaps
//! - `cpu`: CPU percentage from /proc/<pid>/stat
//! - `liveness`: Signal-0 probe and scheduler state

pub mod children;
pub mod cpu;
pub mod liveness;
pub mod memory;
pub mod status;

use serde::Serialize;

// Re-export commonly used types
pub use children::children;
pub use cpu::{cpu_usage, CpuUsage, CLK_TCK};
pub use liveness::{is_running, process_state, ProcessState};
pub use memory::{memory_usage, parse_memory_map, MapTotals, MemoryUsage};
pub use status::{parse_kb_field, read_status_map, ProcessStatus};

/// One combined sample of CPU and memory usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProcessStats {
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
}

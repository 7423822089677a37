//! CLI command implementations for herakles-proc-watch.
//!
//! This module provides implementations for all CLI subcommands:
//! - `status`: Identity, state and virtual memory of one process
//! - `stats`: One memory + CPU sample
//! - `children`: Direct child listing
//! - `watch`: Periodic sampling until interrupted
//! - `check`: /proc access validation

pub mod check;
pub mod inspect;
pub mod watch;

// Re-export command functions
pub use check::command_check;
pub use inspect::{command_children, command_stats, command_status};
pub use watch::command_watch;

//! CLI arguments and subcommands for herakles-proc-watch.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-proc-watch",
    about = "Watch a Linux process: liveness, status, tree RSS/swap and CPU usage",
    long_about = "Watch a Linux process: liveness, status, tree RSS/swap and CPU usage.\n\n\
                  Reads /proc directly to report a process's identity and state, the resident \
                  and swapped memory of the process plus its direct children, and its CPU \
                  usage, once or as a periodic stream.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-proc-watch | More info: https://www.herakles.now | Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Root of the process pseudo-filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Sampling interval for `watch` in milliseconds
    #[arg(short = 'i', long)]
    pub interval_ms: Option<u64>,

    /// How long to wait for the process to appear, in milliseconds
    #[arg(long)]
    pub open_timeout_ms: Option<u64>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show name, state, virtual memory and liveness of a process
    Status {
        /// Target process id
        pid: u32,
    },

    /// Take one memory + CPU sample of a process and its direct children
    Stats {
        /// Target process id
        pid: u32,
    },

    /// Sample a process periodically until interrupted
    Watch {
        /// Target process id
        pid: u32,

        /// Stop after this many samples
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// List direct child process ids
    Children {
        /// Target process id
        pid: u32,
    },

    /// Validate /proc access and parsing for a process (default: self)
    Check {
        /// Process id to probe
        pid: Option<u32>,
    },
}

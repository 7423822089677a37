//! Configuration management for herakles-proc-watch.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{bail, Context};
use clap::ValueEnum;
use herakles_proc_watch::{ProcFs, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::{Args, ConfigFormat, LogLevel};

// Default configuration constants
pub const DEFAULT_PROC_ROOT: &str = herakles_proc_watch::procfs::DEFAULT_PROC_ROOT;
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 10;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 500;

/// Effective configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Sampling
    #[serde(alias = "interval-ms")]
    pub interval_ms: Option<u64>,

    // Handle construction retry
    #[serde(alias = "open-timeout-ms")]
    pub open_timeout_ms: Option<u64>,
    #[serde(alias = "initial-backoff-ms")]
    pub initial_backoff_ms: Option<u64>,
    #[serde(alias = "max-backoff-ms")]
    pub max_backoff_ms: Option<u64>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    /// "text" | "json"
    pub output: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            interval_ms: Some(DEFAULT_INTERVAL_MS),
            open_timeout_ms: Some(DEFAULT_OPEN_TIMEOUT_MS),
            initial_backoff_ms: Some(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff_ms: Some(DEFAULT_MAX_BACKOFF_MS),
            log_level: Some("info".into()),
            output: Some("text".into()),
        }
    }
}

impl Config {
    pub fn procfs(&self) -> ProcFs {
        ProcFs::new(
            self.proc_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
        )
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            deadline: Duration::from_millis(
                self.open_timeout_ms.unwrap_or(DEFAULT_OPEN_TIMEOUT_MS),
            ),
            initial_backoff: Duration::from_millis(
                self.initial_backoff_ms.unwrap_or(DEFAULT_INITIAL_BACKOFF_MS),
            ),
            max_backoff: Duration::from_millis(
                self.max_backoff_ms.unwrap_or(DEFAULT_MAX_BACKOFF_MS),
            ),
        }
    }

    pub fn json_output(&self) -> bool {
        self.output.as_deref() == Some("json")
    }

    /// Log level from the config file; unknown names fall back to info.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|s| LogLevel::from_str(s, true).ok())
            .unwrap_or(LogLevel::Info)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.interval_ms == Some(0) {
        bail!("interval_ms must be greater than zero");
    }
    if cfg.open_timeout_ms == Some(0) {
        bail!("open_timeout_ms must be greater than zero");
    }

    let initial = cfg.initial_backoff_ms.unwrap_or(DEFAULT_INITIAL_BACKOFF_MS);
    let max = cfg.max_backoff_ms.unwrap_or(DEFAULT_MAX_BACKOFF_MS);
    if initial > max {
        bail!(
            "initial_backoff_ms ({}) must not exceed max_backoff_ms ({})",
            initial,
            max
        );
    }

    if let Some(output) = cfg.output.as_deref() {
        if output != "text" && output != "json" {
            bail!("Invalid output '{}', expected 'text' or 'json'", output);
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            bail!("Invalid log_level '{}'", level);
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = Some(interval_ms);
    }
    if let Some(timeout_ms) = args.open_timeout_ms {
        config.open_timeout_ms = Some(timeout_ms);
    }
    if args.json {
        config.output = Some("json".into());
    }
    if let Some(level) = args.log_level {
        config.log_level = level
            .to_possible_value()
            .map(|v| v.get_name().to_string());
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => {
            let defaults = [
                "/etc/herakles/proc-watch.yaml",
                "/etc/herakles/proc-watch.yml",
                "/etc/herakles/proc-watch.json",
                "./herakles-proc-watch.yaml",
                "./herakles-proc-watch.yml",
                "./herakles-proc-watch.json",
            ];
            match defaults.iter().map(Path::new).find(|p| p.exists()) {
                Some(p) => p.to_path_buf(),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(config)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    println!("{output}");
    Ok(())
}

//! Watch command implementation.
//!
//! Streams periodic samples of one process until the sample count is
//! reached, the process goes away, or SIGINT/SIGTERM arrives.

use anyhow::Context;
use chrono::{DateTime, Utc};
use herakles_proc_watch::{ProcessHandle, ProcessStats};
use serde::Serialize;
use tokio::{signal, task};
use tracing::{info, warn};

use crate::config::Config;

/// One line of `watch` output.
#[derive(Debug, Serialize)]
struct WatchRecord {
    timestamp: DateTime<Utc>,
    pid: u32,
    seq: usize,
    #[serde(flatten)]
    stats: ProcessStats,
}

impl WatchRecord {
    fn render_text(&self) -> String {
        format!(
            "{} pid={} rss={} kB swap={} kB rss+swap={} kB cpu={:.1}%",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.pid,
            self.stats.memory.rss_kb,
            self.stats.memory.swap_kb(),
            self.stats.memory.rss_swap_kb,
            self.stats.cpu.percentage
        )
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), stopping watch...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping watch...");
        }
    }
}

/// Opens the handle on the blocking pool, since the open retries with sleeps.
async fn open_handle(pid: u32, config: &Config) -> anyhow::Result<ProcessHandle> {
    let procfs = config.procfs();
    let policy = config.retry_policy();
    task::spawn_blocking(move || ProcessHandle::open_with(procfs, pid, policy))
        .await
        .context("Handle open task failed")?
        .with_context(|| format!("Failed to open process {}", pid))
}

/// Samples `pid` every configured interval, printing one record per sample.
pub async fn command_watch(
    pid: u32,
    count: Option<usize>,
    config: &Config,
) -> anyhow::Result<()> {
    let handle = open_handle(pid, config).await?;
    let mut stream = handle.watch_stats(config.interval())?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut seq = 0usize;
    let mut failure = None;

    loop {
        if count.is_some_and(|n| seq >= n) {
            break;
        }

        tokio::select! {
            _ = &mut shutdown => break,
            item = stream.next() => match item {
                Some(Ok(stats)) => {
                    seq += 1;
                    let record = WatchRecord {
                        timestamp: Utc::now(),
                        pid,
                        seq,
                        stats,
                    };
                    if config.json_output() {
                        println!("{}", serde_json::to_string(&record)?);
                    } else {
                        println!("{}", record.render_text());
                    }
                }
                Some(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                None => break,
            }
        }
    }

    stream.cancel().await;
    info!("Watch of pid {} finished after {} samples", pid, seq);

    match failure {
        Some(e) if e.is_not_found() => {
            info!("Process {} exited", pid);
            Ok(())
        }
        Some(e) => Err(anyhow::Error::new(e).context(format!("Sampling of {} failed", pid))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use herakles_proc_watch::{CpuUsage, MemoryUsage};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn record() -> WatchRecord {
        WatchRecord {
            timestamp: Utc
                .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
            pid: 42,
            seq: 3,
            stats: ProcessStats {
                cpu: CpuUsage { percentage: 12.5 },
                memory: MemoryUsage {
                    rss_kb: 300,
                    rss_swap_kb: 350,
                },
            },
        }
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(
            record().render_text(),
            "2024-05-01T12:00:00.000Z pid=42 rss=300 kB swap=50 kB rss+swap=350 kB cpu=12.5%"
        );
    }

    #[test]
    fn test_json_record_fields() {
        let value = serde_json::to_value(record()).expect("serialize");
        assert_eq!(value["pid"], 42);
        assert_eq!(value["seq"], 3);
        assert_eq!(value["memory"]["rss_swap_kb"], 350);
        assert!(value["timestamp"]
            .as_str()
            .is_some_and(|t| t.starts_with("2024-05-01T12:00:00")));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_waiting_for_process_keeps_runtime_responsive() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = Config {
            proc_root: Some(dir.path().to_path_buf()),
            open_timeout_ms: Some(400),
            ..Config::default()
        };

        let start = Instant::now();
        let (result, timer_done) = tokio::join!(command_watch(77, Some(1), &config), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            start.elapsed()
        });

        assert!(result.is_err());
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert!(
            timer_done < Duration::from_millis(300),
            "timer was starved for {timer_done:?}"
        );
    }
}

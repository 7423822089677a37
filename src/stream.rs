//! Periodic sampling of a process in a background task.
//!
//! A [`StatsStream`] owns one tokio task and one ticker. Each tick samples
//! memory then CPU on the blocking pool and publishes one [`ProcessStats`].
//! A failed sample is delivered as a final `Err` item and ends the stream.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{ProcWatchError, Result};
use crate::process::{cpu_usage, memory_usage, ProcessStats};
use crate::procfs::ProcFs;

/// Samples buffered between the task and a slow consumer.
const SAMPLE_BUFFER: usize = 16;

/// Memory + CPU sampling for one pid, detached from any status handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSampler {
    procfs: ProcFs,
    pid: u32,
}

impl StatsSampler {
    pub fn new(procfs: ProcFs, pid: u32) -> Self {
        Self { procfs, pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Aggregates memory, then samples CPU, so a memory spike is seen before
    /// the CPU cost of the aggregation itself is charged.
    pub fn sample(&self) -> Result<ProcessStats> {
        let memory = memory_usage(&self.procfs, self.pid)?;
        let cpu = cpu_usage(&self.procfs, self.pid)?;
        Ok(ProcessStats { cpu, memory })
    }
}

/// Lifecycle of a [`StatsStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    Created,
    Running,
    Cancelled,
    Faulted,
}

type SharedState = Arc<Mutex<StreamState>>;

fn load_state(state: &SharedState) -> StreamState {
    match state.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn store_state(state: &SharedState, next: StreamState) {
    match state.lock() {
        Ok(mut guard) => *guard = next,
        Err(poisoned) => *poisoned.into_inner() = next,
    }
}

/// A cancellable stream of periodic samples.
///
/// Dropping the stream stops the background task at its next wake-up.
#[derive(Debug)]
pub struct StatsStream {
    sampler: StatsSampler,
    interval: Duration,
    state: SharedState,
    rx: Option<mpsc::Receiver<Result<ProcessStats>>>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StatsStream {
    /// Creates a stream in the `Created` state. A zero interval is rejected.
    pub fn new(sampler: StatsSampler, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(ProcWatchError::InvalidConfiguration(
                "sampling interval must be greater than zero".into(),
            ));
        }

        Ok(Self {
            sampler,
            interval,
            state: Arc::new(Mutex::new(StreamState::Created)),
            rx: None,
            stop_tx: None,
            task: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.sampler.pid()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> StreamState {
        load_state(&self.state)
    }

    /// Spawns the sampling task on the current tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.state() != StreamState::Created {
            return Err(ProcWatchError::InvalidConfiguration(format!(
                "stream for pid {} cannot start from state {:?}",
                self.pid(),
                self.state()
            )));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ProcWatchError::InvalidConfiguration(format!("no tokio runtime available: {e}"))
        })?;

        let (tx, rx) = mpsc::channel(SAMPLE_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel();

        store_state(&self.state, StreamState::Running);
        let task = runtime.spawn(run(
            Arc::new(self.sampler.clone()),
            self.interval,
            tx,
            stop_rx,
            self.state.clone(),
        ));

        self.rx = Some(rx);
        self.stop_tx = Some(stop_tx);
        self.task = Some(task);

        info!(
            "Started stats stream for pid {} every {:?}",
            self.pid(),
            self.interval
        );
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn take_task(&mut self) -> Option<JoinHandle<()>> {
        self.task.take()
    }

    #[cfg(test)]
    pub(crate) fn take_receiver(&mut self) -> Option<mpsc::Receiver<Result<ProcessStats>>> {
        self.rx.take()
    }

    /// Waits for the next sample.
    ///
    /// Returns `None` once the stream has ended: after a fault has been
    /// delivered, after `cancel`, or if it was never started.
    pub async fn next(&mut self) -> Option<Result<ProcessStats>> {
        self.rx.as_mut()?.recv().await
    }

    /// Stops the task and discards anything not yet received.
    ///
    /// When this returns the task has exited and `next` yields `None`.
    pub async fn cancel(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Stats task for pid {} ended abnormally: {}", self.pid(), e);
            }
        }
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            while rx.try_recv().is_ok() {}
        }

        if self.state() != StreamState::Faulted {
            store_state(&self.state, StreamState::Cancelled);
        }
        info!("Stats stream for pid {} cancelled", self.pid());
    }
}

async fn run(
    sampler: Arc<StatsSampler>,
    period: Duration,
    tx: mpsc::Sender<Result<ProcessStats>>,
    mut stop_rx: oneshot::Receiver<()>,
    state: SharedState,
) {
    let pid = sampler.pid();
    let mut ticker = time::interval(period);
    // A slow sample pushes the schedule back instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        let s = sampler.clone();
        let sample = match task::spawn_blocking(move || s.sample()).await {
            Ok(result) => result,
            Err(e) => Err(ProcWatchError::SampleTask {
                pid,
                detail: e.to_string(),
            }),
        };

        let faulted = sample.is_err();
        if let Err(e) = &sample {
            warn!("Stats stream for pid {} faulted: {}", pid, e);
            store_state(&state, StreamState::Faulted);
        }

        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            sent = tx.send(sample) => {
                if sent.is_err() {
                    debug!("Consumer for pid {} went away, stopping", pid);
                    break;
                }
            }
        }

        if faulted {
            break;
        }
    }

    debug!("Stats task for pid {} exiting", pid);
}

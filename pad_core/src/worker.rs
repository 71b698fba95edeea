//! Dedicated sampling thread.
//!
//! `PadWorker::spawn` moves the scheduler (and with it the bus, the clock
//! line and every data line) into one thread. The latest `CycleReport` is
//! offered through a bounded channel that the worker keeps drained itself, so
//! a slow or absent consumer never stalls sampling.
//!
//! Each `PadWorker` owns exactly one thread, joined when the handle is
//! dropped. Shutdown is observed at tick boundaries, so the worst-case stop
//! latency is one tick plus one ready timeout per channel.
use crossbeam_channel as xch;
use pad_traits::{Actuator, Clock, LoadCellBus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crate::error::{PadError, Result};
use crate::observe::CycleReport;
use crate::scheduler::{RunSummary, SamplingScheduler};
use crate::status::StatusHandle;

pub struct PadWorker {
    rx: xch::Receiver<CycleReport>,
    status: StatusHandle,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<RunSummary>>,
}

impl PadWorker {
    pub fn spawn<B, A, K>(mut scheduler: SamplingScheduler<B, A, K>) -> Result<Self>
    where
        B: LoadCellBus + Send + 'static,
        A: Actuator + Send + 'static,
        K: Clock + Send + 'static,
    {
        let (tx, rx) = xch::bounded(1);
        let drain = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let status = scheduler.status();

        let join_handle = std::thread::Builder::new()
            .name("pad-sampler".into())
            .spawn(move || {
                let summary = scheduler.run_with(&shutdown_clone, |report| {
                    // Keep only the newest report.
                    let _ = drain.try_recv();
                    let _ = tx.try_send(report);
                });
                tracing::trace!("sampler thread exiting cleanly");
                summary
            })
            .map_err(|e| eyre::Report::new(PadError::State(format!("spawn sampler thread: {e}"))))?;

        Ok(Self {
            rx,
            status,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Reader for the per-channel status board.
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Most recent cycle report since the last call, if any.
    pub fn latest(&self) -> Option<CycleReport> {
        self.rx.try_iter().last()
    }

    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Signal shutdown, wait for the current tick to finish and return the totals.
    pub fn stop(mut self) -> Result<RunSummary> {
        self.shutdown.store(true, Ordering::Release);
        match self.join_handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                eyre::Report::new(PadError::State("sampler thread panicked".into()))
            }),
            None => Err(eyre::Report::new(PadError::State(
                "sampler already stopped".into(),
            ))),
        }
    }
}

impl Drop for PadWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(summary) => {
                    tracing::trace!(cycles = summary.cycles, "sampler thread joined");
                }
                Err(e) => {
                    // In Drop; nothing to propagate to.
                    tracing::warn!(?e, "sampler thread panicked during shutdown");
                }
            }
        }
    }
}

//! Background decay and forgetting.
//!
//! The cycle runs on its own named thread and locks the shared bank once per
//! tick. Stopping is explicit: [`AttentionCycle::stop`] signals the thread
//! and joins it, and dropping the handle does the same.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::attention::AttentionBank;
use crate::error::{GraphError, GraphResult};

/// Handle to the periodic attention cycle.
pub struct AttentionCycle {
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    cycles: Arc<AtomicU64>,
}

impl AttentionCycle {
    /// Start decaying `bank` every `interval`.
    ///
    /// # Errors
    /// - `Internal`: zero interval or the thread could not be spawned.
    pub fn spawn(bank: Arc<Mutex<AttentionBank>>, interval: Duration) -> GraphResult<Self> {
        if interval.is_zero() {
            return Err(GraphError::internal("attention cycle interval must be positive"));
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let cycles = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&cycles);

        let worker = thread::Builder::new()
            .name("hypergraph-attention".to_string())
            .spawn(move || cycle_loop(&bank, &stop_rx, interval, &counter))
            .map_err(|e| GraphError::internal(format!("failed to spawn attention cycle: {e}")))?;

        tracing::info!(interval_ms = interval.as_millis(), "attention cycle started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
            cycles,
        })
    }

    /// Number of completed cycles.
    #[must_use]
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Stop the cycle and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            tracing::info!(cycles = self.cycles_completed(), "attention cycle stopped");
        }
    }
}

fn cycle_loop(
    bank: &Mutex<AttentionBank>,
    stop_rx: &Receiver<()>,
    interval: Duration,
    cycles: &AtomicU64,
) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let Ok(mut guard) = bank.lock() else {
                    tracing::error!("attention bank lock poisoned; stopping cycle");
                    return;
                };
                let report = guard.run_cycle();
                drop(guard);
                cycles.fetch_add(1, Ordering::AcqRel);
                tracing::trace!(
                    decayed = report.decayed,
                    forgotten = report.forgotten.len(),
                    "attention tick"
                );
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

impl std::fmt::Debug for AttentionCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttentionCycle")
            .field("running", &self.worker.is_some())
            .field("cycles", &self.cycles_completed())
            .finish()
    }
}

impl Drop for AttentionCycle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

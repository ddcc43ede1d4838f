//! Fire-and-forget dispatch of atoms to the collaborators.
//!
//! A single named worker thread drains a bounded queue and calls
//! `persist` and `vectorize`. Submission never blocks the atom store: when
//! the queue is full the job is dropped and logged.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::atom::Atom;
use crate::config::HookConfig;
use crate::storage::traits::{AtomPersistence, AtomVectorizer, StorageError};

enum HookJob {
    Atom(Box<Atom>),
    Flush(Sender<()>),
}

fn run_hooks(
    atom: &Atom,
    persistence: Option<&dyn AtomPersistence>,
    vectorizer: Option<&dyn AtomVectorizer>,
) {
    if let Some(p) = persistence {
        if let Err(err) = p.persist(atom) {
            tracing::warn!(atom_id = %atom.id, error = %err, "failed to persist atom");
        }
    }

    if let Some(v) = vectorizer {
        if atom.name.is_none() {
            tracing::trace!(atom_id = %atom.id, "skipping vectorization of unnamed atom");
            return;
        }
        if let Err(err) = v.vectorize(atom) {
            tracing::warn!(atom_id = %atom.id, error = %err, "failed to vectorize atom");
        }
    }
}

/// Background dispatcher for persistence and vectorization hooks.
pub struct HookDispatcher {
    tx: Option<Sender<HookJob>>,
    worker: Option<JoinHandle<()>>,
    queue_capacity: usize,
}

impl HookDispatcher {
    /// Start the worker thread.
    ///
    /// # Errors
    /// - `BackendError`: the worker thread could not be spawned.
    pub fn start(
        persistence: Option<Arc<dyn AtomPersistence>>,
        vectorizer: Option<Arc<dyn AtomVectorizer>>,
        config: &HookConfig,
    ) -> Result<Self, StorageError> {
        let queue_capacity = config.queue_capacity.max(1);
        let (tx, rx) = bounded::<HookJob>(queue_capacity);

        let worker = thread::Builder::new()
            .name("hypergraph-hooks".to_string())
            .spawn(move || worker_loop(&rx, persistence.as_deref(), vectorizer.as_deref()))
            .map_err(|e| StorageError::BackendError(format!("failed to spawn hook worker: {e}")))?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            queue_capacity,
        })
    }

    /// Queue an atom snapshot for the collaborators. Never blocks.
    pub fn submit(&self, atom: &Atom) {
        if let Err(err) = self.try_submit(HookJob::Atom(Box::new(atom.clone()))) {
            tracing::warn!(atom_id = %atom.id, error = %err, "dropped hook job");
        }
    }

    /// Wait until every job queued before this call has been handled.
    ///
    /// # Errors
    /// - `Disconnected`: the worker is gone or did not answer within `timeout`.
    pub fn flush(&self, timeout: Duration) -> Result<(), StorageError> {
        let (ack_tx, ack_rx) = bounded::<()>(1);
        let tx = self.tx.as_ref().ok_or(StorageError::Disconnected)?;
        tx.send_timeout(HookJob::Flush(ack_tx), timeout)
            .map_err(|_| StorageError::Disconnected)?;
        ack_rx
            .recv_timeout(timeout)
            .map_err(|_| StorageError::Disconnected)
    }

    fn try_submit(&self, job: HookJob) -> Result<(), StorageError> {
        let tx = self.tx.as_ref().ok_or(StorageError::Disconnected)?;
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(StorageError::QueueFull {
                capacity: self.queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(StorageError::Disconnected),
        }
    }
}

fn worker_loop(
    rx: &Receiver<HookJob>,
    persistence: Option<&dyn AtomPersistence>,
    vectorizer: Option<&dyn AtomVectorizer>,
) {
    while let Ok(job) = rx.recv() {
        match job {
            HookJob::Atom(atom) => run_hooks(&atom, persistence, vectorizer),
            HookJob::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("queue_capacity", &self.queue_capacity)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Drop for HookDispatcher {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain queued jobs and exit.
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::atom::{AtomSpec, AtomType};
    use crate::storage::memory::{InMemoryAtomArchive, LexicalVectorIndex};

    struct FailingPersistence {
        calls: AtomicUsize,
    }

    impl AtomPersistence for FailingPersistence {
        fn persist(&self, _atom: &Atom) -> Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::BackendError("offline".to_string()))
        }
    }

    #[test]
    fn submitted_atoms_reach_both_collaborators() {
        let archive = Arc::new(InMemoryAtomArchive::new());
        let vectors = Arc::new(LexicalVectorIndex::new());
        let dispatcher = HookDispatcher::start(
            Some(archive.clone()),
            Some(vectors.clone()),
            &HookConfig::default(),
        )
        .unwrap();

        let named = AtomSpec::concept("cat").into_atom();
        let unnamed = AtomSpec::new(AtomType::And).into_atom();
        dispatcher.submit(&named);
        dispatcher.submit(&unnamed);
        dispatcher.flush(Duration::from_secs(2)).unwrap();

        assert_eq!(archive.len().unwrap(), 2);
        assert!(vectors.embedding(named.id).unwrap().is_some());
        assert!(vectors.embedding(unnamed.id).unwrap().is_none());
    }

    #[test]
    fn collaborator_failures_are_swallowed() {
        let failing = Arc::new(FailingPersistence {
            calls: AtomicUsize::new(0),
        });
        let dispatcher =
            HookDispatcher::start(Some(failing.clone()), None, &HookConfig::default()).unwrap();

        dispatcher.submit(&AtomSpec::concept("a").into_atom());
        dispatcher.submit(&AtomSpec::concept("b").into_atom());
        dispatcher.flush(Duration::from_secs(2)).unwrap();

        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }
}

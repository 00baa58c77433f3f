//! Idle-worker registry.
//!
//! A bounded queue of worker inboxes. A worker pushes its own inbox whenever it
//! becomes idle; the dispatcher pops one per job and forwards the job into it.
//! An inbox is present iff its worker is idle, so the queue itself is the only
//! synchronization point for assignment.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::Job;

/// Private inbox of one worker. Holds at most one job.
#[derive(Debug, Clone)]
pub struct WorkerInbox {
    worker_id: usize,
    tx: Sender<Job>,
}

impl WorkerInbox {
    /// Create an inbox and the receiving end kept by the worker.
    pub(crate) fn new(worker_id: usize) -> (Self, Receiver<Job>) {
        let (tx, rx) = bounded(1);
        (Self { worker_id, tx }, rx)
    }

    /// Worker that owns this inbox.
    #[must_use]
    pub const fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Hand a job to the worker without blocking. Gives the job back if the
    /// worker is gone or (against the registry contract) still busy.
    pub(crate) fn forward(&self, job: Job) -> Result<(), Job> {
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) | TrySendError::Disconnected(job) => job,
        })
    }
}

/// Bounded registry of idle workers, capacity = worker count.
#[derive(Debug, Clone)]
pub struct IdleRegistry {
    tx: flume::Sender<WorkerInbox>,
    rx: flume::Receiver<WorkerInbox>,
    capacity: usize,
}

impl IdleRegistry {
    /// Create a registry for `capacity` workers (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = flume::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Mark a worker idle. Never blocks; gives the inbox back if the registry is
    /// full, which means a worker registered twice.
    ///
    /// # Errors
    ///
    /// Returns the inbox if it could not be registered.
    pub fn register(&self, inbox: WorkerInbox) -> Result<(), WorkerInbox> {
        self.tx.try_send(inbox).map_err(flume::TrySendError::into_inner)
    }

    /// Take one idle worker, waiting until one registers.
    pub async fn acquire(&self) -> Option<WorkerInbox> {
        self.rx.recv_async().await.ok()
    }

    /// Number of workers currently idle.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.rx.len()
    }

    /// Maximum number of idle entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove every registered inbox.
    pub fn drain(&self) -> Vec<WorkerInbox> {
        self.rx.drain().collect()
    }
}

//! The dispatcher: intake, assignment, completion and shutdown.
//!
//! ```text
//! add_job ──► intake (rendezvous) ──► run loop ──► assignment task ──► idle worker inbox
//!                                        ▲                                   │
//!                         result sink ◄──┴──── completion queue ◄────────────┘
//! ```
//!
//! The run loop never waits on a particular job. Assignment (taking an idle
//! worker and forwarding the job to it) runs in a spawned task, bounded by a
//! semaphore. Intake is only polled while the loop holds a free permit, so when
//! every permit is taken intake pauses while completions and shutdown are
//! still served.
//!
//! A job is counted by `add_job` before it crosses the intake. Both sides race
//! to claim it: the run loop when it receives the job, the caller's guard when
//! the `add_job` future is dropped before the hand-off. The winner owns the count.
//!
//! Shutdown: `stop` closes the tracker (new jobs are rejected) and cancels the
//! shutdown token. The loop then drains: already-counted jobs are still
//! received, assigned and delivered, and `run` returns once the tracker is zero.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::knowledge::get_knowledge;
use super::worker::{join_workers, spawn_worker, WorkerContext};
use super::{
    make_result, DispatchError, HttpResult, IdleRegistry, InFlightTracker, Job, JobId,
    KnowledgeRecord, KnowledgeStore, ResultSink, ScanContext, ScanError, ScanExecutor,
    ScanOutcome,
};
use crate::config::{DispatcherConfig, ScannerTemplate};

/// Lifecycle of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Constructed, `run` not called yet.
    Idle,
    /// Accepting and dispatching jobs.
    Running,
    /// Shutdown requested; finishing in-flight jobs.
    Draining,
    /// `run` has returned.
    Stopped,
}

/// Statistics about dispatcher activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Workers currently registered as idle.
    pub idle_workers: usize,
    /// Jobs added but not yet delivered.
    pub in_flight: usize,
    /// Total jobs accepted by `add_job`.
    pub submitted: u64,
    /// Total results delivered.
    pub completed: u64,
    /// Delivered results whose scan failed.
    pub failed: u64,
}

/// A counted job crossing the intake.
struct Admission {
    job: Job,
    claimed: Arc<AtomicBool>,
}

impl Admission {
    /// Claim the job for the run loop. `false` if its caller already gave up.
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }
}

/// Releases the in-flight count of a job whose hand-off never completed.
struct AdmissionGuard<'a> {
    tracker: &'a InFlightTracker,
    claimed: Arc<AtomicBool>,
    delivered: bool,
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.delivered && !self.claimed.swap(true, Ordering::AcqRel) {
            let remaining = self.tracker.finish();
            debug!(in_flight = remaining, "Abandoned add_job released its slot");
        }
    }
}

#[derive(Debug, Default)]
struct DispatchCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Bounded-concurrency scan job dispatcher.
///
/// Share it behind an `Arc`: one task drives [`Dispatcher::run`] while any
/// number of callers add jobs and control shutdown.
pub struct Dispatcher<E>
where
    E: ScanExecutor,
{
    /// Normalized configuration.
    config: DispatcherConfig,
    knowledge: Arc<dyn KnowledgeStore>,
    executor: E,
    scanner: Arc<ScannerTemplate>,
    payload_verify: Arc<str>,

    /// Unbuffered job intake.
    intake_tx: flume::Sender<Admission>,
    intake_rx: flume::Receiver<Admission>,

    registry: IdleRegistry,
    tracker: InFlightTracker,
    shutdown: CancellationToken,
    state: Mutex<DispatcherState>,
    counters: DispatchCounters,
}

impl<E> std::fmt::Debug for Dispatcher<E>
where
    E: ScanExecutor,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("worker_count", &self.config.worker_count)
            .field("state", &self.state())
            .field("in_flight", &self.tracker.in_flight())
            .field("shutdown_cancelled", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<E> Dispatcher<E>
where
    E: ScanExecutor,
{
    /// Create a dispatcher. Nothing is started until [`Dispatcher::run`].
    ///
    /// A worker count of zero is normalized to one; the idle-worker registry is
    /// sized to the normalized count.
    pub fn new(config: DispatcherConfig, knowledge: Arc<dyn KnowledgeStore>, executor: E) -> Self {
        let config = config.normalized();
        let (intake_tx, intake_rx) = flume::bounded(0);
        let registry = IdleRegistry::new(config.worker_count);
        let scanner = Arc::new(config.scanner.clone());
        let payload_verify = Arc::from(config.payload_verify.as_str());

        Self {
            config,
            knowledge,
            executor,
            scanner,
            payload_verify,
            intake_tx,
            intake_rx,
            registry,
            tracker: InFlightTracker::new(),
            shutdown: CancellationToken::new(),
            state: Mutex::new(DispatcherState::Idle),
            counters: DispatchCounters::default(),
        }
    }

    /// Effective (normalized) configuration.
    #[must_use]
    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Number of worker threads `run` starts.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Capacity of the idle-worker registry; always equals `worker_count`.
    #[must_use]
    pub const fn pool_capacity(&self) -> usize {
        self.registry.capacity()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        *self.state.lock()
    }

    /// Start the workers and dispatch jobs until shutdown has drained.
    ///
    /// Every job accepted by `add_job` produces exactly one result on `sink`,
    /// in completion order. Returns after [`Dispatcher::stop`] once all
    /// in-flight jobs have been delivered and the workers have exited.
    ///
    /// # Errors
    ///
    /// - `DispatchError::AlreadyRunning` if `run` was already called
    /// - `DispatchError::WorkerSpawn` if a worker thread cannot be started
    pub async fn run<S>(&self, sink: S) -> Result<(), DispatchError>
    where
        S: ResultSink,
    {
        self.transition(DispatcherState::Idle, DispatcherState::Running)?;

        let worker_count = self.config.worker_count;
        let (completion_tx, completion_rx) = flume::unbounded::<ScanOutcome>();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let ctx = WorkerContext {
                worker_id,
                executor: self.executor.clone(),
                registry: self.registry.clone(),
                completions: completion_tx.clone(),
                release: release_rx.clone(),
                scan_ctx: ScanContext {
                    worker_id,
                    payload_verify: Arc::clone(&self.payload_verify),
                    scanner: Arc::clone(&self.scanner),
                },
            };
            match spawn_worker(ctx) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(release_tx);
                    self.tracker.close();
                    self.set_state(DispatcherState::Stopped);
                    return Err(DispatchError::WorkerSpawn(e));
                }
            }
        }
        drop(release_rx);

        info!(
            worker_count = worker_count,
            max_pending_assignments = self.config.max_pending_assignments,
            knowledge_targets = self.knowledge.len(),
            "Dispatcher running"
        );

        let assign_slots = Arc::new(Semaphore::new(self.config.max_pending_assignments));
        let mut slot: Option<OwnedSemaphorePermit> = None;
        let mut draining = false;

        loop {
            if draining && self.tracker.in_flight() == 0 {
                break;
            }

            tokio::select! {
                () = self.shutdown.cancelled(), if !draining => {
                    draining = true;
                    self.tracker.close();
                    self.set_state(DispatcherState::Draining);
                    info!(in_flight = self.tracker.in_flight(), "Dispatcher draining");
                }
                // An abandoned add_job can drop the count without any loop event.
                () = self.tracker.wait_idle_async(), if draining => {}
                permit = Arc::clone(&assign_slots).acquire_owned(), if slot.is_none() => {
                    let Ok(permit) = permit else {
                        warn!("Assignment semaphore closed unexpectedly");
                        break;
                    };
                    slot = Some(permit);
                }
                admission = self.intake_rx.recv_async(), if slot.is_some() => {
                    let Ok(admission) = admission else {
                        warn!("Job intake closed unexpectedly");
                        break;
                    };
                    if !admission.claim() {
                        debug!(job_id = %admission.job.id, "Job abandoned by its caller, skipping");
                        continue;
                    }
                    self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                    if let Some(permit) = slot.take() {
                        self.spawn_assignment(admission.job, permit, completion_tx.clone());
                    }
                }
                outcome = completion_rx.recv_async() => {
                    let Ok(outcome) = outcome else {
                        warn!("Completion queue closed unexpectedly");
                        break;
                    };
                    self.complete(outcome, &sink).await;
                }
            }
        }

        // Release idle workers and wait for their threads.
        drop(slot);
        drop(release_tx);
        drop(completion_tx);
        self.registry.drain();
        let join_timeout = Duration::from_millis(self.config.worker_join_timeout_ms);
        if let Err(e) =
            tokio::task::spawn_blocking(move || join_workers(workers, join_timeout)).await
        {
            warn!(error = %e, "Worker join task failed");
        }

        self.set_state(DispatcherState::Stopped);
        info!(
            completed = self.counters.completed.load(Ordering::Relaxed),
            failed = self.counters.failed.load(Ordering::Relaxed),
            "Dispatcher stopped"
        );
        Ok(())
    }

    /// Add a job for `http`, looking up its target knowledge.
    ///
    /// Waits only for the run loop to take the job off the intake, never for a
    /// worker to become idle. Before `run` starts, this waits until it does.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::ShuttingDown` after [`Dispatcher::stop`].
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future before it resolves withdraws the job: it is
    /// neither counted nor delivered.
    pub async fn add_job(&self, http: HttpResult) -> Result<JobId, DispatchError> {
        let (admission, mut guard) = self.prepare_job(http)?;
        let job_id = admission.job.id;
        if self.intake_tx.send_async(admission).await.is_err() {
            return Err(DispatchError::Internal("job intake closed".into()));
        }
        guard.delivered = true;
        Ok(job_id)
    }

    /// Blocking variant of [`Dispatcher::add_job`] for non-async callers.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::ShuttingDown` after [`Dispatcher::stop`].
    pub fn add_job_blocking(&self, http: HttpResult) -> Result<JobId, DispatchError> {
        let (admission, mut guard) = self.prepare_job(http)?;
        let job_id = admission.job.id;
        if self.intake_tx.send(admission).is_err() {
            return Err(DispatchError::Internal("job intake closed".into()));
        }
        guard.delivered = true;
        Ok(job_id)
    }

    /// Knowledge for a target as `(record, found)`; a miss yields the zero value.
    #[must_use]
    pub fn get_knowledge(&self, target_id: &str) -> (KnowledgeRecord, bool) {
        get_knowledge(self.knowledge.as_ref(), target_id)
    }

    /// Jobs added but not yet delivered. Advisory under concurrent activity.
    #[must_use]
    pub fn jobs_in_process(&self) -> usize {
        self.tracker.in_flight()
    }

    /// Block the calling thread until no jobs are in flight.
    pub fn wait(&self) {
        self.tracker.wait_idle();
    }

    /// Like [`Dispatcher::wait`], giving up after `timeout`. Returns `true` if
    /// no jobs were left in flight.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.tracker.wait_idle_timeout(timeout)
    }

    /// Wait asynchronously until no jobs are in flight.
    pub async fn wait_async(&self) {
        self.tracker.wait_idle_async().await;
    }

    /// Request shutdown. Idempotent; any number of callers may call it.
    ///
    /// New jobs are rejected immediately; jobs already added are still delivered.
    pub fn stop(&self) {
        if self.tracker.close() {
            info!(in_flight = self.tracker.in_flight(), "Dispatcher stop requested");
        }
        self.shutdown.cancel();
    }

    /// Whether `add_job` still accepts jobs; `false` once stop was requested.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        !self.tracker.is_closed()
    }

    /// Token cancelled when shutdown is requested. Observers may await
    /// `cancelled()`; cancelling it has the same effect as [`Dispatcher::stop`].
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Current statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            worker_count: self.config.worker_count,
            idle_workers: self.registry.idle_count(),
            in_flight: self.tracker.in_flight(),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    fn prepare_job(
        &self,
        http: HttpResult,
    ) -> Result<(Admission, AdmissionGuard<'_>), DispatchError> {
        let (knowledge, found) = self.get_knowledge(&http.target_id);
        self.tracker.begin()?;
        let job = Job::new(http, knowledge, found).with_encode(self.config.encode.iter().cloned());
        debug!(job_id = %job.id, knowledge_found = found, "Job added");

        let claimed = Arc::new(AtomicBool::new(false));
        let guard = AdmissionGuard {
            tracker: &self.tracker,
            claimed: Arc::clone(&claimed),
            delivered: false,
        };
        Ok((Admission { job, claimed }, guard))
    }

    /// Take an idle worker and forward `job` to it, off the run loop.
    fn spawn_assignment(
        &self,
        job: Job,
        permit: OwnedSemaphorePermit,
        completions: flume::Sender<ScanOutcome>,
    ) {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let Some(inbox) = registry.acquire().await else {
                warn!(job_id = %job.id, "No worker registry available, failing job");
                let _ = completions.send(ScanOutcome::new(
                    job,
                    usize::MAX,
                    Err(ScanError::WorkerUnavailable(usize::MAX)),
                ));
                return;
            };

            let worker_id = inbox.worker_id();
            let job_id = job.id;
            match inbox.forward(job) {
                Ok(()) => debug!(job_id = %job_id, worker_id = worker_id, "Job assigned"),
                Err(job) => {
                    warn!(job_id = %job_id, worker_id = worker_id, "Worker inbox unavailable, failing job");
                    let _ = completions.send(ScanOutcome::new(
                        job,
                        worker_id,
                        Err(ScanError::WorkerUnavailable(worker_id)),
                    ));
                }
            }
        });
    }

    async fn complete<S>(&self, outcome: ScanOutcome, sink: &S)
    where
        S: ResultSink,
    {
        let job_id = outcome.job_id;
        let worker_id = outcome.worker_id;
        if !outcome.is_success() {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }

        if sink.deliver(make_result(outcome)).await.is_err() {
            warn!(job_id = %job_id, "Result sink closed, result dropped");
        }

        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        let remaining = self.tracker.finish();
        debug!(job_id = %job_id, worker_id = worker_id, in_flight = remaining, "Result delivered");
    }

    fn transition(&self, from: DispatcherState, to: DispatcherState) -> Result<(), DispatchError> {
        let mut state = self.state.lock();
        if *state != from {
            return Err(DispatchError::AlreadyRunning);
        }
        *state = to;
        Ok(())
    }

    fn set_state(&self, to: DispatcherState) {
        *self.state.lock() = to;
    }
}

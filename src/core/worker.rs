//! Worker threads.
//!
//! Each worker is a dedicated OS thread with its own single-threaded tokio
//! runtime, so scans never run on the dispatcher's runtime.
//!
//! Lifecycle: register inbox as idle → receive one job → scan → emit exactly
//! one outcome → register again. A worker exits when it is released, when the
//! completion queue closes, or when it cannot re-register.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, error, warn};

use super::{IdleRegistry, ScanContext, ScanError, ScanExecutor, ScanOutcome, WorkerInbox};

/// Everything a worker thread owns.
pub(crate) struct WorkerContext<E> {
    pub worker_id: usize,
    pub executor: E,
    pub registry: IdleRegistry,
    pub completions: flume::Sender<ScanOutcome>,
    /// Disconnects when the dispatcher releases its workers.
    pub release: Receiver<()>,
    pub scan_ctx: ScanContext,
}

/// Spawn a worker thread.
pub(crate) fn spawn_worker<E>(ctx: WorkerContext<E>) -> std::io::Result<JoinHandle<()>>
where
    E: ScanExecutor,
{
    thread::Builder::new()
        .name(format!("sw-worker-{}", ctx.worker_id))
        .spawn(move || run_worker(ctx))
}

fn run_worker<E>(ctx: WorkerContext<E>)
where
    E: ScanExecutor,
{
    let worker_id = ctx.worker_id;
    debug!(worker_id = worker_id, "Worker thread started");

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(
                worker_id = worker_id,
                error = %e,
                "Failed to create worker runtime"
            );
            return;
        }
    };

    let (inbox, jobs) = WorkerInbox::new(worker_id);

    loop {
        if ctx.registry.register(inbox.clone()).is_err() {
            warn!(worker_id = worker_id, "Worker could not register as idle, exiting");
            break;
        }

        let next = crossbeam_channel::select! {
            recv(jobs) -> job => job.ok(),
            recv(ctx.release) -> _ => None,
        };
        let Some(job) = next else {
            debug!(worker_id = worker_id, "Worker released");
            break;
        };

        let job_id = job.id;
        debug!(worker_id = worker_id, job_id = %job_id, "Worker executing job");

        let findings = panic::catch_unwind(AssertUnwindSafe(|| {
            rt.block_on(ctx.executor.scan(&job, &ctx.scan_ctx))
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(worker_id = worker_id, job_id = %job_id, panic = %message, "Scan panicked");
            Err(ScanError::Panicked(message))
        });

        debug!(
            worker_id = worker_id,
            job_id = %job_id,
            ok = findings.is_ok(),
            "Worker completed job"
        );

        if ctx.completions.send(ScanOutcome::new(job, worker_id, findings)).is_err() {
            debug!(worker_id = worker_id, "Completion queue closed, exiting");
            break;
        }
    }

    debug!(worker_id = worker_id, "Worker thread exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Join worker threads, waiting up to `timeout` for each. Workers that do not
/// exit in time are detached.
pub(crate) fn join_workers(workers: Vec<JoinHandle<()>>, timeout: Duration) {
    for (idx, worker) in workers.into_iter().enumerate() {
        let (tx, rx) = std::sync::mpsc::channel();
        let join_thread = thread::spawn(move || {
            let result = worker.join();
            let _ = tx.send(result.is_ok());
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => {
                debug!(worker_id = idx, "Worker joined successfully");
                let _ = join_thread.join();
            }
            Ok(false) => {
                warn!(worker_id = idx, "Worker panicked");
                let _ = join_thread.join();
            }
            Err(_) => {
                warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
            }
        }
    }
}

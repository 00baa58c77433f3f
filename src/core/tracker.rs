//! In-flight job counter with blocking and async drain.
//!
//! The count is `(jobs added) - (results delivered)` and never goes negative.
//! Closing the tracker rejects further `begin` calls, so once a closed tracker
//! reaches zero it stays at zero.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use super::DispatchError;

#[derive(Debug, Default)]
struct TrackerState {
    in_flight: usize,
    closed: bool,
}

/// Synchronized counter of submitted-but-not-delivered jobs.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    state: Mutex<TrackerState>,
    /// Blocking waiters, paired with `state`.
    drained: Condvar,
    /// Async waiters.
    notify: Notify,
}

impl InFlightTracker {
    /// Create an open tracker at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new job. Returns the count after incrementing.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::ShuttingDown` once the tracker is closed.
    pub fn begin(&self) -> Result<usize, DispatchError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DispatchError::ShuttingDown);
        }
        state.in_flight += 1;
        Ok(state.in_flight)
    }

    /// Count a delivered job. Returns the count after decrementing.
    ///
    /// An unmatched call is logged and leaves the count at zero.
    pub fn finish(&self) -> usize {
        let mut state = self.state.lock();
        let Some(remaining) = state.in_flight.checked_sub(1) else {
            tracing::warn!("in-flight tracker finished more jobs than it began");
            return 0;
        };
        state.in_flight = remaining;
        if remaining == 0 {
            self.drained.notify_all();
            self.notify.notify_waiters();
        }
        remaining
    }

    /// Current count. Advisory: may be stale as soon as it returns.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Reject further `begin` calls. Returns `true` on the first call only.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.closed, true)
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Block the calling thread until the count is zero.
    pub fn wait_idle(&self) {
        let mut state = self.state.lock();
        while state.in_flight > 0 {
            self.drained.wait(&mut state);
        }
    }

    /// Block until the count is zero or `timeout` elapses. Returns `true` if drained.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.in_flight > 0 {
            if self.drained.wait_until(&mut state, deadline).timed_out() {
                return state.in_flight == 0;
            }
        }
        true
    }

    /// Wait asynchronously until the count is zero.
    pub async fn wait_idle_async(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent finish cannot be missed.
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

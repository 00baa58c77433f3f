//! Error types for dispatcher and scan operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the dispatcher's control surface.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `run` was called on a dispatcher that already ran.
    #[error("dispatcher is already running")]
    AlreadyRunning,
    /// The dispatcher no longer accepts jobs.
    #[error("dispatcher is shutting down")]
    ShuttingDown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
    /// Internal error (channel closed unexpectedly, etc.).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure of a single scan attempt, carried on the outcome and the delivered result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ScanError {
    /// The scan capability reported a failure.
    #[error("scan failed: {0}")]
    Failed(String),
    /// The scan capability panicked; the message is the panic payload.
    #[error("scan panicked: {0}")]
    Panicked(String),
    /// The job could not be handed to a worker.
    #[error("worker {0} is unavailable")]
    WorkerUnavailable(usize),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

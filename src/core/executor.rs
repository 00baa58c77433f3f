//! Scan capability seam.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Findings, Job, ScanError};
use crate::config::ScannerTemplate;

/// Read-only context shared with every scan a worker runs.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Worker running the scan.
    pub worker_id: usize,
    /// Payload verification mode from configuration.
    pub payload_verify: Arc<str>,
    /// Static scanner settings.
    pub scanner: Arc<ScannerTemplate>,
}

/// The scan/detection capability executed once per job.
///
/// The dispatcher never inspects what a scan does. It only relies on `scan`
/// returning once per call; a panic is caught by the worker and reported as
/// [`ScanError::Panicked`].
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use scan_dispatch::core::{Findings, Job, ScanContext, ScanError, ScanExecutor};
///
/// #[derive(Clone)]
/// struct StatusDiff;
///
/// #[async_trait]
/// impl ScanExecutor for StatusDiff {
///     async fn scan(&self, job: &Job, _ctx: &ScanContext) -> Result<Findings, ScanError> {
///         let changed = job.knowledge_found
///             && job.knowledge.baseline_status != job.http.response.status_code;
///         Ok(Findings { unknown_behavior: changed, ..Findings::default() })
///     }
/// }
/// ```
///
/// # Threading
///
/// `scan` is called from a dedicated worker thread with its own
/// single-threaded tokio runtime, so blocking or CPU-heavy work does not stall
/// the dispatcher.
#[async_trait]
pub trait ScanExecutor: Send + Sync + Clone + 'static {
    /// Scan one job.
    async fn scan(&self, job: &Job, ctx: &ScanContext) -> Result<Findings, ScanError>;
}

//! Job and scan outcome data model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HttpResult, KnowledgeRecord, ScanError};
use crate::util::clock::now_ms;

/// Unique job identifier, assigned when the job is added.
pub type JobId = Uuid;

/// A unit of scan work: one HTTP interaction plus whatever is known about its target.
///
/// Immutable once created; owned by the dispatcher until handed to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier.
    pub id: JobId,
    /// Target knowledge, or the zero value when `knowledge_found` is false.
    pub knowledge: KnowledgeRecord,
    /// Whether the Knowledge Store had an entry for the target.
    pub knowledge_found: bool,
    /// Encodings the scanner should apply to payloads (e.g. `url`, `base64`).
    /// Empty means the payload is used as captured.
    #[serde(default)]
    pub encode: Vec<String>,
    /// The interaction to scan.
    pub http: HttpResult,
    /// Creation time, milliseconds since epoch.
    pub created_at_ms: u128,
}

impl Job {
    /// Create a job with a fresh identifier.
    #[must_use]
    pub fn new(http: HttpResult, knowledge: KnowledgeRecord, knowledge_found: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            knowledge,
            knowledge_found,
            encode: Vec::new(),
            http,
            created_at_ms: now_ms(),
        }
    }

    /// Set the payload encodings for this job.
    #[must_use]
    pub fn with_encode<I, S>(mut self, encodings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encode = encodings.into_iter().map(Into::into).collect();
        self
    }
}

/// A value pulled out of a response by an extraction rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Name of the rule that matched.
    pub pattern: String,
    /// Matched value.
    pub value: String,
}

/// How a payload came back transformed in the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    /// Payload as sent.
    pub payload: String,
    /// Payload as reflected.
    pub reflected: String,
    /// Detected transformation (e.g. `url-encode`, `lowercase`).
    pub format: String,
}

/// Findings produced by a successful scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    /// Extracted data.
    pub extract: Vec<Extraction>,
    /// Lines that differ from the target's baseline.
    pub diff: Vec<String>,
    /// Observed payload transformations.
    pub transformation: Vec<Transformation>,
    /// Whether the response deviates from known behavior.
    pub unknown_behavior: bool,
}

/// What a worker emits for a job: exactly one per job.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Job this outcome belongs to.
    pub job_id: JobId,
    /// Worker that produced it.
    pub worker_id: usize,
    /// The original interaction.
    pub http: HttpResult,
    /// Findings, or why the scan failed.
    pub findings: Result<Findings, ScanError>,
}

impl ScanOutcome {
    /// Build an outcome from a consumed job.
    #[must_use]
    pub fn new(job: Job, worker_id: usize, findings: Result<Findings, ScanError>) -> Self {
        Self {
            job_id: job.id,
            worker_id,
            http: job.http,
            findings,
        }
    }

    /// Whether the scan succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.findings.is_ok()
    }
}

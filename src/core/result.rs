//! Result mapping and delivery.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Extraction, Headers, JobId, ScanError, ScanOutcome, Transformation};

/// Request block of a delivered result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBlock {
    /// Request URI as sent.
    pub url: String,
    /// URL before payload insertion.
    pub url_original: String,
    /// Host.
    pub host: String,
    /// Scheme.
    pub scheme: String,
    /// HTTP method.
    pub method: String,
    /// Request body.
    pub post_body: String,
    /// Protocol version.
    pub proto: String,
    /// Original request headers.
    pub headers: Headers,
}

/// Response block of a delivered result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBlock {
    /// Latency.
    pub time: Duration,
    /// Host that answered.
    pub host: String,
    /// Body.
    pub body: String,
    /// HTML title.
    pub title: String,
    /// Protocol version.
    pub proto: String,
    /// Remote IP address.
    pub ip_address: String,
    /// Status code.
    pub status_code: u16,
    /// Word count.
    pub word_count: usize,
    /// Line count.
    pub line_count: usize,
    /// Content type.
    pub content_type: String,
    /// Body size in bytes.
    pub content_length: usize,
    /// Header count.
    pub header_amount: usize,
    /// Response headers.
    pub headers: Headers,
}

/// Scanner findings block of a delivered result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerBlock {
    /// Extracted data.
    pub extract: Vec<Extraction>,
    /// Baseline diff.
    pub diff: Vec<String>,
    /// Payload transformations.
    pub transformation: Vec<Transformation>,
}

/// Presentation record for one completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Target knowledge key.
    pub target_id: String,
    /// Request identifier.
    pub request_id: String,
    /// Job identifier.
    pub job_id: JobId,
    /// Caller tag.
    pub tag: String,
    /// Capture time, milliseconds since epoch.
    pub date_ms: u128,
    /// Payload sent.
    pub payload: String,
    /// Response deviates from known behavior.
    pub unknown_behavior: bool,
    /// Whether the scan succeeded.
    pub ok: bool,
    /// Request data.
    pub request: RequestBlock,
    /// Response data.
    pub response: ResponseBlock,
    /// Scanner findings; empty when the scan failed.
    pub scanner: ScannerBlock,
    /// Failure description when `ok` is false.
    pub error: Option<String>,
}

/// What the result sink receives: one per completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Mapped presentation record.
    pub output: ResultRecord,
    /// Scan failure, if any.
    pub error: Option<ScanError>,
}

impl ScanResult {
    /// Whether the job's scan succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Map a worker outcome to the delivered result.
///
/// Request and response fields are copied verbatim. A failed scan produces
/// `ok = false`, an empty scanner block and the failure in both `error` fields.
#[must_use]
pub fn make_result(outcome: ScanOutcome) -> ScanResult {
    let ScanOutcome {
        job_id,
        http,
        findings,
        ..
    } = outcome;
    let req = http.request;
    let resp = http.response;

    let (unknown_behavior, scanner, error) = match findings {
        Ok(f) => (
            f.unknown_behavior,
            ScannerBlock {
                extract: f.extract,
                diff: f.diff,
                transformation: f.transformation,
            },
            None,
        ),
        Err(e) => (false, ScannerBlock::default(), Some(e)),
    };

    ScanResult {
        output: ResultRecord {
            target_id: http.target_id,
            request_id: http.request_id,
            job_id,
            tag: http.tag,
            date_ms: http.date_ms,
            payload: http.payload,
            unknown_behavior,
            ok: error.is_none(),
            request: RequestBlock {
                url: req.request_uri,
                url_original: req.url_original,
                host: req.host,
                scheme: req.scheme,
                method: req.method,
                post_body: req.body,
                proto: req.proto,
                headers: req.headers,
            },
            response: ResponseBlock {
                time: resp.time,
                host: resp.host,
                body: resp.body,
                title: resp.title,
                proto: resp.proto,
                ip_address: resp.ip_address,
                status_code: resp.status_code,
                word_count: resp.word_count,
                line_count: resp.line_count,
                content_type: resp.content_type,
                content_length: resp.body_size,
                header_amount: resp.header_amount,
                headers: resp.headers,
            },
            scanner,
            error: error.as_ref().map(ToString::to_string),
        },
        error,
    }
}

/// Consumer endpoint for delivered results.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    /// Deliver one result.
    ///
    /// # Errors
    ///
    /// Gives the result back if the consumer has gone away.
    async fn deliver(&self, result: ScanResult) -> Result<(), ScanResult>;
}

#[async_trait]
impl ResultSink for flume::Sender<ScanResult> {
    async fn deliver(&self, result: ScanResult) -> Result<(), ScanResult> {
        self.send_async(result).await.map_err(flume::SendError::into_inner)
    }
}

#[async_trait]
impl ResultSink for tokio::sync::mpsc::Sender<ScanResult> {
    async fn deliver(&self, result: ScanResult) -> Result<(), ScanResult> {
        self.send(result).await.map_err(|e| e.0)
    }
}

#[async_trait]
impl ResultSink for tokio::sync::mpsc::UnboundedSender<ScanResult> {
    async fn deliver(&self, result: ScanResult) -> Result<(), ScanResult> {
        self.send(result).map_err(|e| e.0)
    }
}

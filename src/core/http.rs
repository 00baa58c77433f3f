//! Captured HTTP interaction handed to the dispatcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ordered header list; duplicates are kept in the order they were seen.
pub type Headers = Vec<(String, String)>;

/// The request half of a captured interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Request URI as sent (with payload applied).
    pub request_uri: String,
    /// URL before payload insertion.
    pub url_original: String,
    /// Host component of the URL.
    pub host: String,
    /// Scheme component of the URL.
    pub scheme: String,
    /// HTTP method.
    pub method: String,
    /// Request body.
    pub body: String,
    /// Protocol version, e.g. `HTTP/1.1`.
    pub proto: String,
    /// Headers as originally supplied.
    pub headers: Headers,
}

/// The response half of a captured interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Round-trip latency.
    pub time: Duration,
    /// Host that answered.
    pub host: String,
    /// Response body.
    pub body: String,
    /// HTML title, if any.
    pub title: String,
    /// Protocol version.
    pub proto: String,
    /// Remote IP address.
    pub ip_address: String,
    /// Status code.
    pub status_code: u16,
    /// Number of words in the body.
    pub word_count: usize,
    /// Number of lines in the body.
    pub line_count: usize,
    /// `Content-Type` header value.
    pub content_type: String,
    /// Body size in bytes.
    pub body_size: usize,
    /// Number of response headers.
    pub header_amount: usize,
    /// Response headers.
    pub headers: Headers,
}

/// One captured HTTP interaction plus the metadata needed to build a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResult {
    /// Knowledge Store key of the target this request was sent to.
    pub target_id: String,
    /// Identifier of this request.
    pub request_id: String,
    /// Caller-assigned tag.
    pub tag: String,
    /// Capture time, milliseconds since epoch.
    pub date_ms: u128,
    /// Payload inserted into the request.
    pub payload: String,
    /// Request data.
    pub request: HttpRequest,
    /// Response data.
    pub response: HttpResponse,
}

impl HttpResult {
    /// Minimal result for a target; remaining fields default.
    #[must_use]
    pub fn for_target(target_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            request_id: request_id.into(),
            ..Self::default()
        }
    }
}

//! Dispatcher and scanner configuration structures.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable prefix read by [`DispatcherConfig::from_env`].
pub const ENV_PREFIX: &str = "SCAN_DISPATCH_";

/// Static scanner settings shared by every worker.
///
/// The dispatcher wraps this in an `Arc` at construction and never mutates it;
/// the scan capability reads it through [`crate::core::ScanContext`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerTemplate {
    /// Enabled scan techniques (e.g. `extract`, `diff`, `transformation`).
    pub techniques: BTreeSet<String>,
    /// Free-form technique options.
    pub options: BTreeMap<String, serde_json::Value>,
}

impl ScannerTemplate {
    /// Create an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a technique.
    #[must_use]
    pub fn with_technique(mut self, technique: impl Into<String>) -> Self {
        self.techniques.insert(technique.into());
        self
    }

    /// Set a technique option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Whether a technique is enabled.
    #[must_use]
    pub fn enables(&self, technique: &str) -> bool {
        self.techniques.contains(technique)
    }

    /// Look up an option value.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }
}

/// Dispatcher configuration.
///
/// Constructed once and read-only for the dispatcher's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of worker threads. `0` is normalized to `1`.
    pub worker_count: usize,
    /// Payload verification mode handed to the scan capability.
    pub payload_verify: String,
    /// Maximum assignments waiting for an idle worker before intake pauses.
    /// `0` means "same as `worker_count`".
    pub max_pending_assignments: usize,
    /// How long shutdown waits for each worker thread to exit.
    pub worker_join_timeout_ms: u64,
    /// Payload encodings attached to every job.
    pub encode: Vec<String>,
    /// Static scanner settings.
    pub scanner: ScannerTemplate,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            payload_verify: String::new(),
            max_pending_assignments: 0,
            worker_join_timeout_ms: 2_000,
            encode: Vec::new(),
            scanner: ScannerTemplate::default(),
        }
    }
}

impl DispatcherConfig {
    /// Create a configuration with defaults (one worker per CPU).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the payload verification mode.
    #[must_use]
    pub fn with_payload_verify(mut self, mode: impl Into<String>) -> Self {
        self.payload_verify = mode.into();
        self
    }

    /// Set the pending-assignment bound.
    #[must_use]
    pub fn with_max_pending_assignments(mut self, max: usize) -> Self {
        self.max_pending_assignments = max;
        self
    }

    /// Set the per-worker join timeout used at shutdown.
    #[must_use]
    pub fn with_worker_join_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.worker_join_timeout_ms = timeout_ms;
        self
    }

    /// Set the payload encodings attached to every job.
    #[must_use]
    pub fn with_encode<I, S>(mut self, encodings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encode = encodings.into_iter().map(Into::into).collect();
        self
    }

    /// Set the scanner template.
    #[must_use]
    pub fn with_scanner(mut self, scanner: ScannerTemplate) -> Self {
        self.scanner = scanner;
        self
    }

    /// Return a copy with `worker_count >= 1` and `max_pending_assignments >= 1`.
    ///
    /// A zero worker count is corrected to one with a warning rather than rejected.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.worker_count == 0 {
            tracing::warn!("worker_count is 0, running with a single worker");
            cfg.worker_count = 1;
        }
        if cfg.max_pending_assignments == 0 {
            cfg.max_pending_assignments = cfg.worker_count;
        }
        cfg
    }

    /// Validate configuration values that cannot be normalized.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_join_timeout_ms == 0 {
            return Err("worker_join_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or validation fails.
    pub fn from_json_str(input: &str) -> AppResult<Self> {
        let cfg: Self = serde_json::from_str(input).context("parse dispatcher config")?;
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }

    /// Build configuration from `SCAN_DISPATCH_*` environment variables,
    /// loading a `.env` file first if one exists.
    ///
    /// Recognized variables: `WORKERS`, `PAYLOAD_VERIFY`, `MAX_PENDING`,
    /// `JOIN_TIMEOUT_MS`, `ENCODE` (comma-separated) and `SCANNER` (a
    /// JSON-encoded [`ScannerTemplate`]).
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Build configuration from an arbitrary key lookup (unprefixed keys).
    ///
    /// # Errors
    ///
    /// Returns an error if a present value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup("WORKERS") {
            cfg.worker_count = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_PREFIX}WORKERS: {raw}"))?;
        }
        if let Some(raw) = lookup("PAYLOAD_VERIFY") {
            cfg.payload_verify = raw;
        }
        if let Some(raw) = lookup("MAX_PENDING") {
            cfg.max_pending_assignments = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_PREFIX}MAX_PENDING: {raw}"))?;
        }
        if let Some(raw) = lookup("JOIN_TIMEOUT_MS") {
            cfg.worker_join_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_PREFIX}JOIN_TIMEOUT_MS: {raw}"))?;
        }
        if let Some(raw) = lookup("ENCODE") {
            cfg.encode = raw
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = lookup("SCANNER") {
            cfg.scanner = serde_json::from_str(&raw)
                .with_context(|| format!("invalid {ENV_PREFIX}SCANNER"))?;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

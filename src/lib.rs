//! # Scan Dispatch
//!
//! A bounded-concurrency job dispatcher for HTTP scan workloads.
//!
//! The dispatcher accepts scan requests (one per captured HTTP interaction),
//! hands each one to a fixed pool of dedicated worker threads, collects their
//! outcomes, and delivers exactly one mapped result per job to a caller-owned
//! result sink. It tracks how many jobs are in flight and supports a graceful,
//! wait-for-drain shutdown.
//!
//! ## Key Features
//!
//! - **Idle-Worker Registry**: Workers register their own inbox when idle; a job is
//!   assigned to whichever worker became idle first
//! - **Backpressure-free submission**: `add_job` only waits on the intake rendezvous,
//!   never on a worker becoming free
//! - **Exactly-once delivery**: Every accepted job yields one result, including
//!   failed and panicked scans
//! - **Drain on shutdown**: `stop` is idempotent and broadcast; `run` returns only
//!   once every accepted job has been delivered
//! - **Read-only knowledge**: Per-target knowledge is injected behind a lookup-only trait
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scan_dispatch::config::DispatcherConfig;
//! use scan_dispatch::core::{Dispatcher, StaticKnowledge};
//!
//! let dispatcher = Arc::new(Dispatcher::new(
//!     DispatcherConfig::new().with_worker_count(4),
//!     Arc::new(StaticKnowledge::empty()),
//!     my_scanner, // Implements ScanExecutor
//! ));
//!
//! let (tx, rx) = flume::unbounded();
//! let runner = {
//!     let dispatcher = Arc::clone(&dispatcher);
//!     tokio::spawn(async move { dispatcher.run(tx).await })
//! };
//!
//! dispatcher.add_job(http_result).await?;
//! dispatcher.wait_async().await;
//! dispatcher.stop();
//! runner.await??;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration models for the dispatcher and scanner template.
pub mod config;
/// Dispatcher, worker lifecycle, tracker, registry and the job data model.
pub mod core;
/// Builders to assemble a dispatcher from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;

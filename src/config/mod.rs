//! Configuration models for the dispatcher and scanner template.

pub mod dispatcher;

pub use dispatcher::{DispatcherConfig, ScannerTemplate};

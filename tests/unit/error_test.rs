//! Tests for error types

use scan_dispatch::core::{DispatchError, ScanError};

#[test]
fn test_shutting_down_error() {
    let err = DispatchError::ShuttingDown;
    assert_eq!(format!("{}", err), "dispatcher is shutting down");
}

#[test]
fn test_worker_spawn_error_from_io() {
    let io = std::io::Error::other("no threads left");
    let err: DispatchError = io.into();
    assert_eq!(format!("{}", err), "failed to spawn worker thread: no threads left");
}

#[test]
fn test_scan_panicked_error() {
    let err = ScanError::Panicked("index out of bounds".to_string());
    assert_eq!(format!("{}", err), "scan panicked: index out of bounds");
}

#[test]
fn test_scan_error_serde() {
    let err = ScanError::WorkerUnavailable(2);
    let json = serde_json::to_string(&err).unwrap();
    let back: ScanError = serde_json::from_str(&json).unwrap();
    assert_eq!(back, err);
}

//! Tests for configuration validation

use scan_dispatch::config::{DispatcherConfig, ScannerTemplate};

#[test]
fn test_default_config_is_valid() {
    let cfg = DispatcherConfig::default();
    assert!(cfg.validate().is_ok());
    assert!(cfg.worker_count >= 1);
}

#[test]
fn test_invalid_join_timeout() {
    let cfg = DispatcherConfig::new().with_worker_join_timeout_ms(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_workers_normalized_not_rejected() {
    let cfg = DispatcherConfig::new().with_worker_count(0);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.normalized().worker_count, 1);
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "worker_count": 8,
        "payload_verify": "reflect",
        "max_pending_assignments": 16,
        "worker_join_timeout_ms": 500,
        "scanner": {
            "techniques": ["extract", "diff"],
            "options": { "max_diff_lines": 40 }
        }
    }"#;

    let cfg = DispatcherConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.worker_count, 8);
    assert_eq!(cfg.max_pending_assignments, 16);
    assert!(cfg.scanner.enables("diff"));
    assert_eq!(
        cfg.scanner.option("max_diff_lines"),
        Some(&serde_json::json!(40))
    );
}

#[test]
fn test_config_from_json_rejects_invalid() {
    let json = r#"{ "worker_join_timeout_ms": 0 }"#;
    assert!(DispatcherConfig::from_json_str(json).is_err());
    assert!(DispatcherConfig::from_json_str("not json").is_err());
}

#[test]
fn test_scanner_template_builder() {
    let template = ScannerTemplate::new()
        .with_technique("transformation")
        .with_option("encodings", serde_json::json!(["url", "html"]));
    assert!(template.enables("transformation"));
    assert!(!template.enables("extract"));
    assert!(template.option("encodings").is_some());
}

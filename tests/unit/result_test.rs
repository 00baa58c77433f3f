//! Tests for result mapping

use scan_dispatch::core::{
    make_result, Findings, HttpResult, Job, KnowledgeRecord, ScanError, ScanOutcome, Transformation,
};

#[test]
fn test_transformation_is_carried() {
    let job = Job::new(HttpResult::for_target("t", "r"), KnowledgeRecord::default(), false);
    let findings = Findings {
        transformation: vec![Transformation {
            payload: "<X>".into(),
            reflected: "&lt;x&gt;".into(),
            format: "html-escape+lowercase".into(),
        }],
        ..Findings::default()
    };

    let result = make_result(ScanOutcome::new(job, 1, Ok(findings)));
    assert_eq!(result.output.scanner.transformation.len(), 1);
    assert_eq!(result.output.scanner.transformation[0].reflected, "&lt;x&gt;");
}

#[test]
fn test_unavailable_worker_result() {
    let job = Job::new(HttpResult::for_target("t", "r"), KnowledgeRecord::default(), false);
    let result = make_result(ScanOutcome::new(job, 4, Err(ScanError::WorkerUnavailable(4))));
    assert!(!result.output.ok);
    assert_eq!(result.output.error.as_deref(), Some("worker 4 is unavailable"));
}

#[test]
fn test_result_record_serializes() {
    let job = Job::new(HttpResult::for_target("t", "r"), KnowledgeRecord::default(), false);
    let result = make_result(ScanOutcome::new(job, 0, Ok(Findings::default())));
    let json = serde_json::to_value(&result.output).unwrap();
    assert_eq!(json["target_id"], "t");
    assert_eq!(json["ok"], true);
    assert!(json["error"].is_null());
}

//! Tests for dispatcher builders

use async_trait::async_trait;
use scan_dispatch::builders::DispatcherBuilder;
use scan_dispatch::config::DispatcherConfig;
use scan_dispatch::core::{
    DispatcherState, Findings, Job, KnowledgeStore, ScanContext, ScanError, ScanExecutor,
    StaticKnowledge,
};
use std::sync::Arc;

#[derive(Clone)]
struct NoopScan;

#[async_trait]
impl ScanExecutor for NoopScan {
    async fn scan(&self, _job: &Job, _ctx: &ScanContext) -> Result<Findings, ScanError> {
        Ok(Findings::default())
    }
}

#[test]
fn test_builder_defaults_to_empty_knowledge() {
    let dispatcher = DispatcherBuilder::new(DispatcherConfig::new().with_worker_count(1))
        .build(NoopScan)
        .unwrap();
    let (_, found) = dispatcher.get_knowledge("anything");
    assert!(!found);
    assert_eq!(dispatcher.state(), DispatcherState::Idle);
}

#[test]
fn test_builder_shared_store() {
    let store: Arc<dyn KnowledgeStore> = Arc::new(StaticKnowledge::empty());
    let dispatcher = DispatcherBuilder::new(DispatcherConfig::new().with_worker_count(0))
        .knowledge(Arc::clone(&store))
        .build(NoopScan)
        .unwrap();
    assert_eq!(dispatcher.worker_count(), 1);
    assert_eq!(dispatcher.pool_capacity(), 1);
}

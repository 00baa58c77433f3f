//! Builder to construct a dispatcher from configuration sources.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DispatcherConfig;
use crate::core::{
    AppResult, DispatchError, Dispatcher, KnowledgeRecord, KnowledgeStore, ScanExecutor,
    StaticKnowledge,
};

/// Assembles configuration, knowledge and a scan executor into a [`Dispatcher`].
///
/// ```rust,ignore
/// let dispatcher = DispatcherBuilder::from_env()?
///     .knowledge_map(known_targets)
///     .build(my_scanner)?;
/// ```
#[derive(Clone)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .field("knowledge_targets", &self.knowledge.as_ref().map(|k| k.len()))
            .finish()
    }
}

impl DispatcherBuilder {
    /// Start from an explicit configuration.
    #[must_use]
    pub const fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            knowledge: None,
        }
    }

    /// Start from `SCAN_DISPATCH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        Ok(Self::new(DispatcherConfig::from_env()?))
    }

    /// Start from a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or invalid.
    pub fn from_json_str(input: &str) -> AppResult<Self> {
        Ok(Self::new(DispatcherConfig::from_json_str(input)?))
    }

    /// Use a shared knowledge store.
    #[must_use]
    pub fn knowledge(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(store);
        self
    }

    /// Freeze a map of target knowledge into the store.
    #[must_use]
    pub fn knowledge_map(self, records: HashMap<String, KnowledgeRecord>) -> Self {
        self.knowledge(Arc::new(StaticKnowledge::new(records)))
    }

    /// Adjust the configuration before building.
    #[must_use]
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatcherConfig) -> DispatcherConfig,
    {
        self.config = f(self.config);
        self
    }

    /// Build the dispatcher. Without a knowledge store, every lookup misses.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidConfig` if validation fails.
    pub fn build<E>(self, executor: E) -> Result<Dispatcher<E>, DispatchError>
    where
        E: ScanExecutor,
    {
        self.config
            .validate()
            .map_err(DispatchError::InvalidConfig)?;
        let knowledge = self
            .knowledge
            .unwrap_or_else(|| Arc::new(StaticKnowledge::empty()));
        Ok(Dispatcher::new(self.config, knowledge, executor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Findings, Job, ScanContext, ScanError};
    use async_trait::async_trait;

    #[derive(Clone)]
    struct NoopScan;

    #[async_trait]
    impl ScanExecutor for NoopScan {
        async fn scan(&self, _job: &Job, _ctx: &ScanContext) -> Result<Findings, ScanError> {
            Ok(Findings::default())
        }
    }

    #[test]
    fn test_build_with_knowledge_map() {
        let mut records = HashMap::new();
        records.insert(
            "t1".to_string(),
            KnowledgeRecord {
                target_id: "t1".into(),
                baseline_status: 404,
                ..KnowledgeRecord::default()
            },
        );

        let dispatcher = DispatcherBuilder::new(DispatcherConfig::new().with_worker_count(2))
            .knowledge_map(records)
            .build(NoopScan)
            .unwrap();

        assert_eq!(dispatcher.worker_count(), 2);
        let (k, found) = dispatcher.get_knowledge("t1");
        assert!(found);
        assert_eq!(k.baseline_status, 404);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = DispatcherBuilder::new(DispatcherConfig::new())
            .configure(|c| c.with_worker_join_timeout_ms(0))
            .build(NoopScan);
        assert!(matches!(result, Err(DispatchError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_json() {
        let builder = DispatcherBuilder::from_json_str(
            r#"{"worker_count": 3, "payload_verify": "reflect", "scanner": {"techniques": ["extract"]}}"#,
        )
        .unwrap();
        let dispatcher = builder.build(NoopScan).unwrap();
        assert_eq!(dispatcher.worker_count(), 3);
        assert_eq!(dispatcher.config().payload_verify, "reflect");
        assert!(dispatcher.config().scanner.enables("extract"));
    }
}

//! Dispatcher core: job data model, worker lifecycle, tracker and registry.

pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod http;
pub mod job;
pub mod knowledge;
pub mod registry;
pub mod result;
pub mod tracker;
mod worker;

pub use dispatcher::{Dispatcher, DispatcherState, DispatcherStats};
pub use error::{AppResult, DispatchError, ScanError};
pub use executor::{ScanContext, ScanExecutor};
pub use http::{Headers, HttpRequest, HttpResponse, HttpResult};
pub use job::{Extraction, Findings, Job, JobId, ScanOutcome, Transformation};
pub use knowledge::{get_knowledge, KnowledgeRecord, KnowledgeStore, StaticKnowledge};
pub use registry::{IdleRegistry, WorkerInbox};
pub use result::{
    make_result, RequestBlock, ResponseBlock, ResultRecord, ResultSink, ScanResult, ScannerBlock,
};
pub use tracker::InFlightTracker;

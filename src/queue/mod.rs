/// Execution dispatch queue
///
/// Accepting a run request and executing it are decoupled: callers persist a
/// PENDING execution record, enqueue a run request, and return immediately.
/// A queue backend delivers requests one at a time to the consumer, which
/// drives the engine and finalizes the record.
///
/// Backends are injected explicitly wherever dispatch happens; there is no
/// global queue singleton.

// Engine-driving consumer shared by all backends
pub mod consumer;

// In-process channel-backed queue
pub mod memory;

// SQLite-backed durable queue
pub mod durable;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::types::WorkflowDefinition;

pub use consumer::ExecutionConsumer;
pub use durable::SqliteQueue;
pub use memory::MemoryQueue;

/// One unit of dispatch: everything the consumer needs to run a workflow
///
/// The definition travels inside the request, so the run is pinned to the
/// definition that existed at enqueue time even if the workflow is edited
/// before the job is picked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub execution_id: String,
    pub workflow_definition: WorkflowDefinition,
    pub trigger_data: Value,
}

/// Accepts run requests for asynchronous execution
#[async_trait]
pub trait ExecutionQueue: Send + Sync {
    async fn enqueue(&self, request: RunRequest) -> anyhow::Result<()>;
}

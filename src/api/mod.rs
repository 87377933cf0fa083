/// HTTP API layer
///
/// REST endpoints for workflow management, run dispatch, execution
/// inspection and inbound webhook triggering. Handlers stay thin: they
/// validate, persist a PENDING execution record and enqueue; the queue
/// worker does the running.

// Workflow CRUD and manual run dispatch
pub mod workflows;

// Execution record and log inspection
pub mod executions;

// Inbound webhook trigger endpoint
pub mod webhooks;

use crate::execution::store::ExecutionStore;
use crate::queue::ExecutionQueue;
use crate::runtime::scheduler::ScheduleService;
use crate::workflow::{registry::WorkflowRegistry, storage::WorkflowStorage};
use std::sync::Arc;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: WorkflowStorage,
    pub registry: Arc<WorkflowRegistry>,
    pub scheduler: Arc<ScheduleService>,
    pub store: ExecutionStore,
    pub queue: Arc<dyn ExecutionQueue>,
}

pub use executions::create_execution_routes;
pub use webhooks::create_webhook_routes;
pub use workflows::create_workflow_routes;

/// Queue consumer
///
/// Backend-agnostic worker body: takes one dequeued run request, moves the
/// execution record RUNNING, drives the engine, and finalizes SUCCESS or
/// FAILED. Both queue backends funnel into this so the record lifecycle is
/// identical regardless of transport.

use crate::execution::store::ExecutionStore;
use crate::queue::RunRequest;
use crate::runtime::engine::ExecutionEngine;
use std::sync::Arc;

pub struct ExecutionConsumer {
    engine: Arc<ExecutionEngine>,
    store: ExecutionStore,
}

impl ExecutionConsumer {
    pub fn new(engine: Arc<ExecutionEngine>, store: ExecutionStore) -> Self {
        Self { engine, store }
    }

    /// Process one run request end to end
    ///
    /// Never panics and never propagates engine failures upward: a failed
    /// run is a FAILED record, not a dead worker. Store errors are traced
    /// and dropped for the same reason.
    pub async fn process(&self, request: RunRequest) {
        let execution_id = request.execution_id;

        if let Err(e) = self.store.mark_running(&execution_id).await {
            tracing::warn!("⚠️ Failed to mark execution {} running: {}", execution_id, e);
        }

        match self
            .engine
            .run(&execution_id, &request.workflow_definition, request.trigger_data)
            .await
        {
            Ok(context) => {
                let output = serde_json::json!(context);
                if let Err(e) = self.store.mark_success(&execution_id, &output).await {
                    tracing::warn!(
                        "⚠️ Failed to mark execution {} success: {}",
                        execution_id,
                        e
                    );
                }
            }
            Err(error) => {
                // The record stores the node's own failure message, not the
                // engine's wrapped form.
                let message = error.failure_message();
                tracing::error!("❌ Execution {} failed: {}", execution_id, message);
                if let Err(e) = self.store.mark_failed(&execution_id, &message).await {
                    tracing::warn!("⚠️ Failed to mark execution {} failed: {}", execution_id, e);
                }
            }
        }
    }
}

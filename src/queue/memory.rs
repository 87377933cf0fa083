/// In-process execution queue
///
/// An unbounded tokio channel drained by a single spawned consumer task, so
/// runs execute one at a time in enqueue order. Jobs do not survive a
/// process restart; the durable backend covers that.

use crate::queue::consumer::ExecutionConsumer;
use crate::queue::{ExecutionQueue, RunRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct MemoryQueue {
    sender: mpsc::UnboundedSender<RunRequest>,
}

impl MemoryQueue {
    /// Create the queue and spawn its consumer loop
    pub fn start(consumer: Arc<ExecutionConsumer>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<RunRequest>();

        tokio::spawn(async move {
            tracing::info!("📬 In-memory execution queue worker started");
            while let Some(request) = receiver.recv().await {
                consumer.process(request).await;
            }
            tracing::info!("📪 In-memory execution queue worker stopped");
        });

        Self { sender }
    }
}

#[async_trait]
impl ExecutionQueue for MemoryQueue {
    async fn enqueue(&self, request: RunRequest) -> anyhow::Result<()> {
        let execution_id = request.execution_id.clone();
        self.sender
            .send(request)
            .map_err(|_| anyhow::anyhow!("execution queue worker is gone"))?;
        tracing::debug!("📥 Enqueued execution {}", execution_id);
        Ok(())
    }
}

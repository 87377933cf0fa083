/// Background cron scheduler for schedule-trigger nodes
///
/// Registers one tokio-cron-scheduler job per schedule-trigger node and
/// hot-reloads jobs when workflows change, without restarting the scheduler.
/// A fired job does not run the workflow inline: it creates a PENDING
/// execution record and enqueues a run request, so scheduled runs take the
/// same dispatch path as manual and webhook runs.

use crate::execution::store::ExecutionStore;
use crate::queue::{ExecutionQueue, RunRequest};
use crate::workflow::registry::WorkflowRegistry;
use crate::workflow::types::{NodeType, StoredWorkflow, WorkflowNode};
use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

pub struct ScheduleService {
    scheduler: Arc<RwLock<JobScheduler>>,
    // Job UUIDs keyed by "workflow_id:node_id", needed to remove jobs on reload
    job_uuid_map: Arc<RwLock<HashMap<String, Uuid>>>,
    registry: Arc<WorkflowRegistry>,
    store: ExecutionStore,
    queue: Arc<dyn ExecutionQueue>,
}

impl ScheduleService {
    pub async fn new(
        registry: Arc<WorkflowRegistry>,
        store: ExecutionStore,
        queue: Arc<dyn ExecutionQueue>,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            job_uuid_map: Arc::new(RwLock::new(HashMap::new())),
            registry,
            store,
            queue,
        })
    }

    /// Register every schedule trigger currently in the registry and start
    pub async fn start(&self) -> Result<()> {
        tracing::info!("⏰ Starting cron scheduler service");

        let workflows = self.registry.get_all_workflows();
        let mut total = 0;
        for workflow in &workflows {
            total += self.reload_workflow_schedules(workflow).await?;
        }
        tracing::info!(
            "📊 Registered {} schedule triggers from {} workflows",
            total,
            workflows.len()
        );

        {
            let scheduler = self.scheduler.read().await;
            scheduler.start().await?;
        }

        tracing::info!("✅ Cron scheduler started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        tracing::info!("⏹️ Stopping cron scheduler service");
        self.job_uuid_map.write().await.clear();
        {
            let mut scheduler = self.scheduler.write().await;
            scheduler.shutdown().await?;
        }
        Ok(())
    }

    /// Hot-reload the cron jobs for one workflow
    ///
    /// Removes every job previously registered for the workflow, then
    /// re-registers from the current definition. Returns the number of
    /// schedule triggers registered.
    pub async fn reload_workflow_schedules(&self, workflow: &StoredWorkflow) -> Result<usize> {
        self.remove_workflow_schedules(&workflow.id).await;

        let schedule_nodes: Vec<&WorkflowNode> = workflow
            .definition
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::ScheduleTrigger)
            .collect();

        for node in &schedule_nodes {
            if let Err(e) = self.register_schedule_job(&workflow.id, node).await {
                tracing::warn!(
                    "⚠️ Failed to register schedule trigger {} in workflow {}: {}",
                    node.id,
                    workflow.id,
                    e
                );
            }
        }

        Ok(schedule_nodes.len())
    }

    /// Remove all cron jobs registered for a workflow
    pub async fn remove_workflow_schedules(&self, workflow_id: &str) {
        let prefix = format!("{}:", workflow_id);
        let mut job_uuid_map = self.job_uuid_map.write().await;
        let stale: Vec<String> = job_uuid_map
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();

        for key in stale {
            if let Some(job_uuid) = job_uuid_map.remove(&key) {
                let scheduler = self.scheduler.read().await;
                if let Err(e) = scheduler.remove(&job_uuid).await {
                    tracing::warn!("⚠️ Failed to remove cron job {}: {}", key, e);
                } else {
                    tracing::debug!("🛑 Removed cron job: {}", key);
                }
            }
        }
    }

    async fn register_schedule_job(&self, workflow_id: &str, node: &WorkflowNode) -> Result<()> {
        let cron = node
            .data
            .config
            .get("cron")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("schedule trigger missing 'cron' config"))?;

        let job_key = format!("{}:{}", workflow_id, node.id);
        tracing::info!("⏰ Registering cron job {} ({})", job_key, cron);

        let workflow_id_owned = workflow_id.to_string();
        let node_id = node.id.clone();
        let registry = Arc::clone(&self.registry);
        let store = self.store.clone();
        let queue = Arc::clone(&self.queue);

        let job = Job::new_async(cron, move |_uuid, _l| {
            let workflow_id = workflow_id_owned.clone();
            let node_id = node_id.clone();
            let registry = Arc::clone(&registry);
            let store = store.clone();
            let queue = Arc::clone(&queue);

            Box::pin(async move {
                tracing::debug!("🔔 Schedule trigger fired: {} in workflow {}", node_id, workflow_id);

                // Deleted workflows keep their jobs until the next reload;
                // firings for them are skipped.
                let Some(compiled) = registry.get_workflow(&workflow_id) else {
                    tracing::debug!("⏭️ Skipping schedule for deleted workflow: {}", workflow_id);
                    return;
                };

                let execution_id = Uuid::new_v4().to_string();
                let trigger_data = json!({
                    "triggeredBy": "schedule",
                    "nodeId": node_id,
                    "firedAt": Utc::now().to_rfc3339(),
                });

                if let Err(e) = store
                    .create_pending(&execution_id, &workflow_id, &trigger_data)
                    .await
                {
                    tracing::error!("❌ Failed to create scheduled execution record: {}", e);
                    return;
                }

                let request = RunRequest {
                    execution_id: execution_id.clone(),
                    workflow_definition: compiled.workflow.definition.clone(),
                    trigger_data,
                };
                if let Err(e) = queue.enqueue(request).await {
                    tracing::error!("❌ Failed to enqueue scheduled execution {}: {}", execution_id, e);
                }
            })
        })?;

        let new_job_uuid = {
            let scheduler = self.scheduler.write().await;
            scheduler.add(job).await?
        };

        self.job_uuid_map.write().await.insert(job_key, new_job_uuid);
        Ok(())
    }
}

/// Hot-reload workflow registry using ArcSwap
///
/// Lock-free, atomic updates to the in-memory workflow map. Each update
/// swaps the entire registry pointer, so concurrent lookups and in-flight
/// runs continue against the old snapshot uninterrupted.

use crate::workflow::storage::WorkflowStorage;
use crate::workflow::types::{NodeType, StoredWorkflow};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// A registered workflow plus the routing metadata extracted from its nodes
///
/// Compilation is lenient: a definition without any trigger node still
/// registers (it can be edited in place), it just cannot be started.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub workflow: StoredWorkflow,

    /// Paths from webhook-trigger node configs, used for inbound routing
    pub webhook_paths: Vec<String>,

    /// Ids of trigger-typed nodes
    pub trigger_node_ids: Vec<String>,
}

/// Lock-free registry of active workflows
#[derive(Debug)]
pub struct WorkflowRegistry {
    workflows: ArcSwap<HashMap<String, CompiledWorkflow>>,
    storage: WorkflowStorage,
}

impl WorkflowRegistry {
    pub fn new(storage: WorkflowStorage) -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            storage,
        }
    }

    /// Populate the registry from storage at startup
    pub async fn init_from_storage(&self) -> Result<()> {
        let stored = self.storage.load_all_workflows().await?;
        let compiled: HashMap<String, CompiledWorkflow> = stored
            .into_iter()
            .map(|(id, workflow)| (id, compile(workflow)))
            .collect();

        self.workflows.store(Arc::new(compiled));
        tracing::info!(
            "Initialized workflow registry with {} workflows",
            self.workflows.load().len()
        );
        Ok(())
    }

    /// Reload a single workflow from storage into the registry
    pub async fn reload_workflow(&self, workflow_id: &str) -> Result<CompiledWorkflow> {
        let workflow = self
            .storage
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", workflow_id))?;

        let compiled = compile(workflow);

        let current = self.workflows.load();
        let mut next = (**current).clone();
        next.insert(workflow_id.to_string(), compiled.clone());
        self.workflows.store(Arc::new(next));

        tracing::info!("Hot-reloaded workflow: {}", workflow_id);
        Ok(compiled)
    }

    /// Lock-free lookup; the clone only bumps Arc reference counts
    pub fn get_workflow(&self, workflow_id: &str) -> Option<CompiledWorkflow> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// All registered workflows, for scheduler scans
    pub fn get_all_workflows(&self) -> Vec<StoredWorkflow> {
        self.workflows
            .load()
            .values()
            .map(|compiled| compiled.workflow.clone())
            .collect()
    }

    /// Resolve an inbound webhook path for a workflow
    ///
    /// Returns true when the workflow has a webhook-trigger node whose
    /// configured path matches.
    pub fn matches_webhook_path(&self, workflow_id: &str, path: &str) -> bool {
        self.get_workflow(workflow_id)
            .map(|compiled| compiled.webhook_paths.iter().any(|p| p == path))
            .unwrap_or(false)
    }

    /// Remove a workflow from the registry
    pub fn remove_workflow(&self, workflow_id: &str) {
        let current = self.workflows.load();
        let mut next = (**current).clone();

        if next.remove(workflow_id).is_some() {
            self.workflows.store(Arc::new(next));
            tracing::info!("Removed workflow from registry: {}", workflow_id);
        }
    }
}

/// Extract routing metadata from a workflow's nodes
fn compile(workflow: StoredWorkflow) -> CompiledWorkflow {
    let mut webhook_paths = Vec::new();
    let mut trigger_node_ids = Vec::new();

    for node in &workflow.definition.nodes {
        if node.node_type.is_trigger() {
            trigger_node_ids.push(node.id.clone());
        }
        if node.node_type == NodeType::WebhookTrigger {
            if let Some(path) = node.data.config.get("path").and_then(|p| p.as_str()) {
                webhook_paths.push(path.to_string());
            }
        }
    }

    CompiledWorkflow {
        workflow,
        webhook_paths,
        trigger_node_ids,
    }
}

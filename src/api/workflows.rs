/// Workflow management REST API endpoints
///
/// CRUD over workflow definitions with hot-reload: every change updates the
/// in-memory registry and the cron scheduler immediately. Also hosts the
/// manual run endpoint, which dispatches through the execution queue.

use crate::api::AppState;
use crate::queue::RunRequest;
use crate::workflow::types::StoredWorkflow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Response for workflow creation/update operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Request body for workflow creation/update
#[derive(Debug, Deserialize)]
pub struct SaveWorkflowRequest {
    pub workflow: StoredWorkflow,
}

/// Request body for a manual run; the trigger payload is optional
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunWorkflowRequest {
    #[serde(default)]
    pub trigger_data: Option<Value>,
}

pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", post(create_workflow))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}", put(update_workflow))
        .route("/api/workflows/{id}", delete(delete_workflow))
        .route("/api/workflows/{id}/run", post(run_workflow))
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: { "workflow": { "id", "name", "definition": { "nodes", "edges" } } }
async fn create_workflow(
    State(state): State<AppState>,
    Json(payload): Json<SaveWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let workflow = payload.workflow;

    if workflow.id.is_empty() || workflow.name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.storage.get_workflow(&workflow.id).await {
        Ok(Some(_)) => return Err(StatusCode::CONFLICT),
        Ok(None) => {}
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    }

    save_and_reload(&state, &workflow).await?;

    tracing::info!("🔥 Created workflow: {} ({})", workflow.id, workflow.name);
    Ok(Json(WorkflowResponse {
        id: workflow.id.clone(),
        message: format!("Workflow '{}' created successfully", workflow.name),
    }))
}

/// List all workflows
///
/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.storage.list_workflows().await {
        Ok(workflows) => Ok(Json(json!({ "workflows": workflows }))),
        Err(e) => {
            tracing::error!("Failed to list workflows: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get a specific workflow by id
///
/// GET /api/workflows/{id}
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredWorkflow>, StatusCode> {
    match state.storage.get_workflow(&id).await {
        Ok(Some(workflow)) => Ok(Json(workflow)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get workflow {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Update an existing workflow
///
/// PUT /api/workflows/{id}
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SaveWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let mut workflow = payload.workflow;
    // The URL is authoritative for the id
    workflow.id = id.clone();

    if workflow.name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.storage.get_workflow(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    }

    save_and_reload(&state, &workflow).await?;

    tracing::info!("🔥 Hot-reloaded workflow: {} ({})", workflow.id, workflow.name);
    Ok(Json(WorkflowResponse {
        id: workflow.id.clone(),
        message: format!("Workflow '{}' updated successfully", workflow.name),
    }))
}

/// Delete a workflow
///
/// DELETE /api/workflows/{id}
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    // Remove cron jobs first so nothing new gets enqueued for this id
    state.scheduler.remove_workflow_schedules(&id).await;
    state.registry.remove_workflow(&id);

    match state.storage.delete_workflow(&id).await {
        Ok(true) => {
            tracing::info!("Deleted workflow: {}", id);
            Ok(Json(json!({ "message": "Workflow deleted successfully" })))
        }
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete workflow: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Start a manual run of a workflow
///
/// POST /api/workflows/{id}/run
/// Body: { "triggerData": { ... } } (optional)
/// Returns 202 with the execution id; poll /api/executions/{id} for status.
async fn run_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RunWorkflowRequest>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let Some(compiled) = state.registry.get_workflow(&id) else {
        return Err(StatusCode::NOT_FOUND);
    };

    let execution_id = Uuid::new_v4().to_string();
    let trigger_data = payload.trigger_data.unwrap_or_else(|| json!({}));

    if let Err(e) = state
        .store
        .create_pending(&execution_id, &id, &trigger_data)
        .await
    {
        tracing::error!("Failed to create execution record: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let request = RunRequest {
        execution_id: execution_id.clone(),
        workflow_definition: compiled.workflow.definition.clone(),
        trigger_data,
    };
    if let Err(e) = state.queue.enqueue(request).await {
        tracing::error!("Failed to enqueue execution {}: {}", execution_id, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "executionId": execution_id, "status": "PENDING" })),
    ))
}

/// Persist a workflow then push it into the registry and scheduler
async fn save_and_reload(state: &AppState, workflow: &StoredWorkflow) -> Result<(), StatusCode> {
    if let Err(e) = state.storage.save_workflow(workflow).await {
        tracing::error!("Failed to save workflow: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    if let Err(e) = state.registry.reload_workflow(&workflow.id).await {
        tracing::error!("Failed to reload workflow into registry: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    if let Err(e) = state.scheduler.reload_workflow_schedules(workflow).await {
        tracing::error!(
            "Failed to reload schedules for workflow {}: {}",
            workflow.id,
            e
        );
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(())
}

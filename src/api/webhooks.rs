/// Inbound webhook trigger endpoint
///
/// POST /webhook/{workflow_id}/{*path} starts a run of the addressed
/// workflow when one of its webhook-trigger nodes is configured with the
/// matching path. The request body becomes the trigger payload and the
/// caller gets 202 with the execution id immediately.

use crate::api::AppState;
use crate::queue::RunRequest;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

pub fn create_webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/{workflow_id}/{*path}", post(handle_webhook))
}

async fn handle_webhook(
    State(state): State<AppState>,
    Path((workflow_id, path)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    // Trigger configs store the path with a leading slash
    let path = format!("/{}", path.trim_start_matches('/'));

    let Some(compiled) = state.registry.get_workflow(&workflow_id) else {
        return Err(StatusCode::NOT_FOUND);
    };
    if !state.registry.matches_webhook_path(&workflow_id, &path) {
        tracing::debug!(
            "Webhook path {} not configured for workflow {}",
            path,
            workflow_id
        );
        return Err(StatusCode::NOT_FOUND);
    }

    // Empty bodies are fine; non-JSON bodies are forwarded as a raw string.
    let payload = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    let trigger_data = json!({
        "triggeredBy": "webhook",
        "path": path,
        "body": payload,
    });

    let execution_id = Uuid::new_v4().to_string();
    if let Err(e) = state
        .store
        .create_pending(&execution_id, &workflow_id, &trigger_data)
        .await
    {
        tracing::error!("Failed to create webhook execution record: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let request = RunRequest {
        execution_id: execution_id.clone(),
        workflow_definition: compiled.workflow.definition.clone(),
        trigger_data,
    };
    if let Err(e) = state.queue.enqueue(request).await {
        tracing::error!("Failed to enqueue webhook execution {}: {}", execution_id, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    tracing::info!(
        "🪝 Webhook {} dispatched execution {} for workflow {}",
        path,
        execution_id,
        workflow_id
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "executionId": execution_id, "status": "PENDING" })),
    ))
}

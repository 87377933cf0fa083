/// Execution inspection endpoints
///
/// Read-only views over the executions and execution_logs tables. Clients
/// poll these after dispatching a run, since dispatch returns before the
/// run finishes.

use crate::api::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ListExecutionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub fn create_execution_routes() -> Router<AppState> {
    Router::new()
        .route("/api/executions/{id}", get(get_execution))
        .route("/api/executions/{id}/logs", get(get_execution_logs))
        .route("/api/workflows/{id}/executions", get(list_executions))
}

/// GET /api/executions/{id}
async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    match state.store.get_execution(&id).await {
        Ok(Some(record)) => Ok(Json(json!(record))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get execution {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/executions/{id}/logs
async fn get_execution_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    match state.store.list_logs(&id).await {
        Ok(logs) => Ok(Json(json!({ "logs": logs }))),
        Err(e) => {
            tracing::error!("Failed to get logs for execution {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/workflows/{id}/executions?limit=50
async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<Value>, StatusCode> {
    match state.store.list_executions(&id, query.limit).await {
        Ok(executions) => Ok(Json(json!({ "executions": executions }))),
        Err(e) => {
            tracing::error!("Failed to list executions for workflow {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Dispatch queue and consumer lifecycle tests
///
/// All tests run against in-memory SQLite. The pool is pinned to a single
/// connection because every :memory: connection would otherwise open its own
/// database.

use flowforge::execution::store::{ExecutionStatus, ExecutionStore, SqliteLogSink};
use flowforge::queue::consumer::ExecutionConsumer;
use flowforge::queue::durable::SqliteQueue;
use flowforge::queue::memory::MemoryQueue;
use flowforge::queue::{ExecutionQueue, RunRequest};
use flowforge::runtime::engine::ExecutionEngine;
use flowforge::runtime::executor::NodeExecutor;
use flowforge::workflow::types::WorkflowDefinition;
use serde_json::json;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use std::time::Duration;

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn consumer_with_store(pool: &SqlitePool) -> (ExecutionStore, Arc<ExecutionConsumer>) {
    let store = ExecutionStore::new(pool.clone());
    store.init_schema().await.unwrap();

    let sink = Arc::new(SqliteLogSink::new(store.clone()));
    let engine = Arc::new(ExecutionEngine::new(Arc::new(NodeExecutor::new()), sink));
    let consumer = Arc::new(ExecutionConsumer::new(engine, store.clone()));
    (store, consumer)
}

fn simple_workflow() -> WorkflowDefinition {
    serde_json::from_value(json!({
        "nodes": [
            { "id": "start", "type": "manual-trigger", "data": {} },
            { "id": "tag", "type": "set", "data": { "config": { "fields": [{ "key": "done", "value": true }] } } }
        ],
        "edges": [
            { "id": "e1", "source": "start", "target": "tag" }
        ]
    }))
    .unwrap()
}

fn failing_workflow() -> WorkflowDefinition {
    serde_json::from_value(json!({
        "nodes": [
            { "id": "start", "type": "manual-trigger", "data": {} },
            { "id": "bad", "type": "code", "data": { "config": { "code": "error('kaput')" } } }
        ],
        "edges": [
            { "id": "e1", "source": "start", "target": "bad" }
        ]
    }))
    .unwrap()
}

/// Poll until the execution leaves PENDING/RUNNING or the deadline passes
async fn wait_for_finish(store: &ExecutionStore, execution_id: &str) -> ExecutionStatus {
    for _ in 0..100 {
        if let Some(record) = store.get_execution(execution_id).await.unwrap() {
            if record.status == ExecutionStatus::Success || record.status == ExecutionStatus::Failed
            {
                return record.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("execution {} never finished", execution_id);
}

#[tokio::test]
async fn consumer_marks_success_with_final_context() {
    let pool = memory_pool().await;
    let (store, consumer) = consumer_with_store(&pool).await;

    store
        .create_pending("exec-1", "wf-1", &json!({ "seed": 1 }))
        .await
        .unwrap();

    consumer
        .process(RunRequest {
            execution_id: "exec-1".to_string(),
            workflow_definition: simple_workflow(),
            trigger_data: json!({ "seed": 1 }),
        })
        .await;

    let record = store.get_execution("exec-1").await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    assert!(record.started_at.is_some());
    assert!(record.finished_at.is_some());

    let output = record.output.unwrap();
    assert_eq!(output["start"], json!({ "seed": 1 }));
    assert_eq!(output["tag"], json!({ "seed": 1, "done": true }));

    let logs = store.list_logs("exec-1").await.unwrap();
    let messages: Vec<&str> = logs.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["Triggered", "Executed"]);
}

#[tokio::test]
async fn consumer_marks_failed_with_node_message() {
    let pool = memory_pool().await;
    let (store, consumer) = consumer_with_store(&pool).await;

    store.create_pending("exec-2", "wf-1", &json!({})).await.unwrap();

    consumer
        .process(RunRequest {
            execution_id: "exec-2".to_string(),
            workflow_definition: failing_workflow(),
            trigger_data: json!({}),
        })
        .await;

    let record = store.get_execution("exec-2").await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Failed);

    // The stored error is the node's own message, not the engine wrapper.
    let error = record.error.unwrap();
    assert!(error.contains("kaput"), "{error}");
    assert!(!error.contains("node 'bad' failed"), "{error}");
}

#[tokio::test]
async fn memory_queue_runs_enqueued_requests() {
    let pool = memory_pool().await;
    let (store, consumer) = consumer_with_store(&pool).await;
    let queue = MemoryQueue::start(consumer);

    store
        .create_pending("exec-3", "wf-1", &json!({ "n": 7 }))
        .await
        .unwrap();
    queue
        .enqueue(RunRequest {
            execution_id: "exec-3".to_string(),
            workflow_definition: simple_workflow(),
            trigger_data: json!({ "n": 7 }),
        })
        .await
        .unwrap();

    assert_eq!(wait_for_finish(&store, "exec-3").await, ExecutionStatus::Success);
}

#[tokio::test]
async fn memory_queue_preserves_enqueue_order() {
    let pool = memory_pool().await;
    let (store, consumer) = consumer_with_store(&pool).await;
    let queue = MemoryQueue::start(consumer);

    for i in 0..3 {
        let id = format!("exec-order-{i}");
        store.create_pending(&id, "wf-1", &json!({})).await.unwrap();
        queue
            .enqueue(RunRequest {
                execution_id: id,
                workflow_definition: simple_workflow(),
                trigger_data: json!({ "i": i }),
            })
            .await
            .unwrap();
    }

    for i in 0..3 {
        let id = format!("exec-order-{i}");
        assert_eq!(wait_for_finish(&store, &id).await, ExecutionStatus::Success);
    }
}

#[tokio::test]
async fn durable_queue_persists_and_processes_jobs() {
    let pool = memory_pool().await;
    let (store, consumer) = consumer_with_store(&pool).await;

    let queue = SqliteQueue::new(pool.clone());
    queue.init_schema().await.unwrap();

    store
        .create_pending("exec-4", "wf-1", &json!({}))
        .await
        .unwrap();
    queue
        .enqueue(RunRequest {
            execution_id: "exec-4".to_string(),
            workflow_definition: simple_workflow(),
            trigger_data: json!({}),
        })
        .await
        .unwrap();

    // The job row exists before any worker runs.
    let (pending,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM queue_jobs WHERE status = 'pending'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(pending, 1);

    queue.spawn_worker(consumer, Duration::from_millis(20));
    assert_eq!(wait_for_finish(&store, "exec-4").await, ExecutionStatus::Success);

    // Give the worker a beat to mark the job row after finishing the run.
    for _ in 0..100 {
        let (completed,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM queue_jobs WHERE status = 'completed'")
                .fetch_one(&pool)
                .await
                .unwrap();
        if completed == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("durable job was never marked completed");
}

#[tokio::test]
async fn durable_queue_requeues_stale_processing_jobs() {
    let pool = memory_pool().await;
    let queue = SqliteQueue::new(pool.clone());
    queue.init_schema().await.unwrap();

    sqlx::query(
        "INSERT INTO queue_jobs (id, payload, status, created_at, updated_at) VALUES ('j1', '{}', 'processing', '2026-01-01', '2026-01-01')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let requeued = queue.requeue_stale().await.unwrap();
    assert_eq!(requeued, 1);

    let (status,): (String,) = sqlx::query_as("SELECT status FROM queue_jobs WHERE id = 'j1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "pending");
}

#[tokio::test]
async fn failed_runs_keep_their_log_trail() {
    let pool = memory_pool().await;
    let (store, consumer) = consumer_with_store(&pool).await;

    store.create_pending("exec-5", "wf-1", &json!({})).await.unwrap();
    consumer
        .process(RunRequest {
            execution_id: "exec-5".to_string(),
            workflow_definition: failing_workflow(),
            trigger_data: json!({}),
        })
        .await;

    let logs = store.list_logs("exec-5").await.unwrap();
    let messages: Vec<&str> = logs.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["Triggered", "Error"]);
    assert!(logs[1].data["error"].as_str().unwrap().contains("kaput"));
}

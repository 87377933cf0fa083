/// SQLite persistence for execution records and their log trail
///
/// The execution record is the durable view of one run: created PENDING by
/// whoever accepts the run request, transitioned RUNNING → SUCCESS/FAILED by
/// the queue consumer, terminal once finished. Log entries are append-only
/// and survive failed runs as the audit trail.

use crate::execution::log::{ExecutionLogEntry, ExecutionLogSink, LogLevel};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::{sqlite::SqlitePool, Row};

/// Lifecycle states of an execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "PENDING",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw {
            "RUNNING" => ExecutionStatus::Running,
            "SUCCESS" => ExecutionStatus::Success,
            "FAILED" => ExecutionStatus::Failed,
            _ => ExecutionStatus::Pending,
        }
    }
}

/// One persisted run of a workflow
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub input: Option<Value>,
    /// The run's final context map (node id → last output), JSON-encoded
    pub output: Option<Value>,
    /// Set only when status is FAILED
    pub error: Option<String>,
}

/// SQLite-backed execution store
#[derive(Debug, Clone)]
pub struct ExecutionStore {
    pool: SqlitePool,
}

impl ExecutionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create executions and execution_logs tables (idempotent)
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                started_at TEXT,
                finished_at TEXT,
                input JSON,
                output JSON,
                error TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS execution_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                execution_id TEXT NOT NULL,
                node_id TEXT NOT NULL,
                message TEXT NOT NULL,
                level TEXT NOT NULL DEFAULT 'info',
                data JSON,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_execution_logs_execution ON execution_logs(execution_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a PENDING record before the run request is enqueued
    pub async fn create_pending(
        &self,
        execution_id: &str,
        workflow_id: &str,
        input: &Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO executions (id, workflow_id, status, input, created_at)
            VALUES (?, ?, 'PENDING', ?, ?)
            "#,
        )
        .bind(execution_id)
        .bind(workflow_id)
        .bind(serde_json::to_string(input)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// PENDING → RUNNING, stamping started_at
    pub async fn mark_running(&self, execution_id: &str) -> Result<()> {
        sqlx::query("UPDATE executions SET status = 'RUNNING', started_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(execution_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// RUNNING → SUCCESS, storing the final context map as the output
    pub async fn mark_success(&self, execution_id: &str, output: &Value) -> Result<()> {
        sqlx::query(
            "UPDATE executions SET status = 'SUCCESS', finished_at = ?, output = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(serde_json::to_string(output)?)
        .bind(execution_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// RUNNING → FAILED, storing the failure message
    pub async fn mark_failed(&self, execution_id: &str, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE executions SET status = 'FAILED', finished_at = ?, error = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(error)
        .bind(execution_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch one execution record
    pub async fn get_execution(&self, execution_id: &str) -> Result<Option<ExecutionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, workflow_id, status, started_at, finished_at, input, output, error
            FROM executions WHERE id = ?
            "#,
        )
        .bind(execution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    /// Most recent executions for a workflow
    pub async fn list_executions(
        &self,
        workflow_id: &str,
        limit: i64,
    ) -> Result<Vec<ExecutionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_id, status, started_at, finished_at, input, output, error
            FROM executions WHERE workflow_id = ?
            ORDER BY created_at DESC LIMIT ?
            "#,
        )
        .bind(workflow_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(record_from_row).collect())
    }

    /// Append one log entry for a node visit
    pub async fn append_log(&self, entry: &ExecutionLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO execution_logs (execution_id, node_id, message, level, data, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.execution_id)
        .bind(&entry.node_id)
        .bind(&entry.message)
        .bind(entry.level.as_str())
        .bind(serde_json::to_string(&entry.data)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Log trail for one execution, in append order
    pub async fn list_logs(&self, execution_id: &str) -> Result<Vec<ExecutionLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT execution_id, node_id, message, level, data
            FROM execution_logs WHERE execution_id = ? ORDER BY id ASC
            "#,
        )
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| {
                let level: String = row.get("level");
                ExecutionLogEntry {
                    execution_id: row.get("execution_id"),
                    node_id: row.get("node_id"),
                    message: row.get("message"),
                    level: if level == "error" { LogLevel::Error } else { LogLevel::Info },
                    data: parse_json_column(row.get("data")),
                }
            })
            .collect();

        Ok(entries)
    }
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> ExecutionRecord {
    let status: String = row.get("status");
    ExecutionRecord {
        id: row.get("id"),
        workflow_id: row.get("workflow_id"),
        status: ExecutionStatus::parse(&status),
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
        input: row.get::<Option<String>, _>("input").map(parse_json_column),
        output: row.get::<Option<String>, _>("output").map(parse_json_column),
        error: row.get("error"),
    }
}

fn parse_json_column(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

/// Production log sink: appends straight into execution_logs
///
/// Persistence failures must never abort a run, so they are logged and
/// dropped here.
#[derive(Debug, Clone)]
pub struct SqliteLogSink {
    store: ExecutionStore,
}

impl SqliteLogSink {
    pub fn new(store: ExecutionStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ExecutionLogSink for SqliteLogSink {
    async fn append(&self, entry: ExecutionLogEntry) {
        if let Err(e) = self.store.append_log(&entry).await {
            tracing::warn!(
                "⚠️ Failed to persist log entry for execution {}: {}",
                entry.execution_id,
                e
            );
        }
    }
}

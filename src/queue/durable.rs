/// SQLite-backed durable execution queue
///
/// Jobs are rows in queue_jobs: enqueue inserts `pending`, a polling worker
/// claims the oldest pending row by flipping it to `processing` in a single
/// UPDATE…RETURNING, runs the consumer, then marks `completed` or `failed`.
/// Pending jobs survive restarts; jobs stuck in `processing` from a crashed
/// worker are requeued on startup.

use crate::queue::consumer::ExecutionConsumer;
use crate::queue::{ExecutionQueue, RunRequest};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteQueue {
    pool: SqlitePool,
}

impl SqliteQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the queue_jobs table (idempotent)
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_jobs (
                id TEXT PRIMARY KEY,
                payload JSON NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_queue_jobs_status ON queue_jobs(status, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Requeue jobs a crashed worker left in `processing`
    pub async fn requeue_stale(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE queue_jobs SET status = 'pending', updated_at = ? WHERE status = 'processing'",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let requeued = result.rows_affected();
        if requeued > 0 {
            tracing::warn!("🔁 Requeued {} stale in-flight queue jobs", requeued);
        }
        Ok(requeued)
    }

    /// Claim the oldest pending job, if any
    ///
    /// Returns the raw payload; decoding happens in the worker so a corrupt
    /// row can be marked `failed` instead of stranding in `processing`.
    async fn claim_next(&self) -> Result<Option<(String, String)>> {
        let row = sqlx::query(
            r#"
            UPDATE queue_jobs
            SET status = 'processing', attempts = attempts + 1, updated_at = ?
            WHERE id = (
                SELECT id FROM queue_jobs
                WHERE status = 'pending'
                ORDER BY created_at ASC
                LIMIT 1
            )
            RETURNING id, payload
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some((row.get("id"), row.get("payload"))))
    }

    async fn mark_job(&self, job_id: &str, status: &str) -> Result<()> {
        sqlx::query("UPDATE queue_jobs SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now().to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Spawn the polling worker loop
    ///
    /// Requeues stale jobs first, then claims and processes one job at a
    /// time, sleeping `poll_interval` whenever the table has no pending work.
    pub fn spawn_worker(&self, consumer: Arc<ExecutionConsumer>, poll_interval: Duration) {
        let queue = self.clone();

        tokio::spawn(async move {
            if let Err(e) = queue.requeue_stale().await {
                tracing::warn!("⚠️ Failed to requeue stale queue jobs: {}", e);
            }
            tracing::info!(
                "📬 Durable execution queue worker started (poll every {:?})",
                poll_interval
            );

            loop {
                match queue.claim_next().await {
                    Ok(Some((job_id, payload))) => {
                        match serde_json::from_str::<RunRequest>(&payload) {
                            Ok(request) => {
                                consumer.process(request).await;
                                // The execution record carries success/failure;
                                // the job row only tracks delivery.
                                if let Err(e) = queue.mark_job(&job_id, "completed").await {
                                    tracing::warn!(
                                        "⚠️ Failed to complete queue job {}: {}",
                                        job_id,
                                        e
                                    );
                                }
                            }
                            Err(e) => {
                                tracing::error!(
                                    "❌ Queue job {} has an undecodable payload: {}",
                                    job_id,
                                    e
                                );
                                if let Err(e) = queue.mark_job(&job_id, "failed").await {
                                    tracing::warn!(
                                        "⚠️ Failed to fail queue job {}: {}",
                                        job_id,
                                        e
                                    );
                                }
                            }
                        }
                    }
                    Ok(None) => {
                        tokio::time::sleep(poll_interval).await;
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Queue claim failed: {}", e);
                        tokio::time::sleep(poll_interval).await;
                    }
                }
            }
        });
    }
}

#[async_trait]
impl ExecutionQueue for SqliteQueue {
    async fn enqueue(&self, request: RunRequest) -> anyhow::Result<()> {
        let job_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO queue_jobs (id, payload, status, created_at, updated_at)
            VALUES (?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(&job_id)
        .bind(serde_json::to_string(&request)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "📥 Enqueued execution {} as durable job {}",
            request.execution_id,
            job_id
        );
        Ok(())
    }
}

/// SQLite persistence for workflow definitions
///
/// Definitions are stored as a JSON column so the editor's wire format
/// round-trips untouched, with indexed id/name columns for lookups.

use crate::workflow::types::{StoredWorkflow, WorkflowDefinition};
use anyhow::Result;
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    pool: SqlitePool,
}

impl WorkflowStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the workflows table (idempotent)
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                definition JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_workflows_name ON workflows(name)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Create or update a workflow atomically
    pub async fn save_workflow(&self, workflow: &StoredWorkflow) -> Result<()> {
        let definition_json = serde_json::to_string(&workflow.definition)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, definition, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(&definition_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieve a workflow by id
    pub async fn get_workflow(&self, id: &str) -> Result<Option<StoredWorkflow>> {
        let row = sqlx::query("SELECT id, name, definition FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let definition_json: String = row.get("definition");
                let definition: WorkflowDefinition = serde_json::from_str(&definition_json)?;
                Ok(Some(StoredWorkflow {
                    id: row.get("id"),
                    name: row.get("name"),
                    definition,
                }))
            }
            None => Ok(None),
        }
    }

    /// List all workflows with basic metadata
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowMetadata>> {
        let rows = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM workflows ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = Vec::new();
        for row in rows {
            workflows.push(WorkflowMetadata {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(workflows)
    }

    /// Load every stored workflow, keyed by id, for registry initialization
    pub async fn load_all_workflows(&self) -> Result<HashMap<String, StoredWorkflow>> {
        let rows = sqlx::query("SELECT id, name, definition FROM workflows")
            .fetch_all(&self.pool)
            .await?;

        let mut workflows = HashMap::new();
        for row in rows {
            let id: String = row.get("id");
            let definition_json: String = row.get("definition");
            let definition: WorkflowDefinition = serde_json::from_str(&definition_json)?;
            workflows.insert(
                id.clone(),
                StoredWorkflow {
                    id,
                    name: row.get("name"),
                    definition,
                },
            );
        }

        Ok(workflows)
    }

    /// Delete a workflow by id; returns whether a row was removed
    pub async fn delete_workflow(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Basic workflow metadata for listing operations
#[derive(Debug, serde::Serialize)]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

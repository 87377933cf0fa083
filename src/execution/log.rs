/// Execution log sink
///
/// The engine appends one or more log entries per node visit (Triggered /
/// Executed / Skipped / Error). The sink is a trait so the engine stays
/// testable without a database; the SQLite sink is the production impl and
/// the in-memory sink backs tests. Append never fails the run; persistence
/// problems are logged and swallowed so the audit trail cannot abort a
/// workflow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

/// Log severity; node failures log at `error`, everything else at `info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

/// One append-only record of a node visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub execution_id: String,
    pub node_id: String,
    /// "Triggered" | "Executed" | "Skipped" | "Error"
    pub message: String,
    pub level: LogLevel,
    /// {input, output} for successful visits, {error} for failures
    pub data: Value,
}

impl ExecutionLogEntry {
    pub fn new(
        execution_id: &str,
        node_id: &str,
        message: &str,
        level: LogLevel,
        data: Value,
    ) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            node_id: node_id.to_string(),
            message: message.to_string(),
            level,
            data,
        }
    }

    pub fn info(execution_id: &str, node_id: &str, message: &str, data: Value) -> Self {
        Self::new(execution_id, node_id, message, LogLevel::Info, data)
    }
}

/// Append-only destination for execution log entries
#[async_trait]
pub trait ExecutionLogSink: Send + Sync {
    async fn append(&self, entry: ExecutionLogEntry);
}

/// In-memory sink for tests and ad-hoc runs
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<ExecutionLogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub fn entries(&self) -> Vec<ExecutionLogEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ExecutionLogSink for MemoryLogSink {
    async fn append(&self, entry: ExecutionLogEntry) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
    }
}

/// Flowforge: workflow execution engine for visually-built automations
///
/// This library provides the execution core behind a visual workflow
/// editor: expression resolution against prior node outputs, typed node
/// execution, worklist graph traversal with branching and error routing,
/// and queue-backed asynchronous dispatch with durable execution records.

// Core configuration and setup
pub mod config;

// Workflow management layer - definitions, storage, hot-reload registry
pub mod workflow;

// Runtime execution layer - graph traversal, node executors, expressions, scheduler
pub mod runtime;

// Execution persistence - run records and append-only log trail
pub mod execution;

// Dispatch queue - in-memory and durable backends plus the shared consumer
pub mod queue;

// HTTP API layer - REST endpoints for workflows, executions and webhooks
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use execution::{ExecutionStatus, ExecutionStore};
pub use queue::{ExecutionQueue, RunRequest};
pub use runtime::{EngineError, ExecutionEngine, NodeExecutor};
pub use server::start_server;
pub use workflow::{NodeType, StoredWorkflow, WorkflowDefinition, WorkflowEdge, WorkflowNode};
